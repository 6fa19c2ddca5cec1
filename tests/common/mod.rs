//! Shared test utilities for integration tests.
//!
//! Builders for in-memory archives and containers, plus a [`Fetcher`] that
//! serves canned bytes.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Write};

use relabel::{Error, Fetcher, Result};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Manifest used by the end-to-end scenarios.
pub const MANIFEST: &str = r#"{
  "manifest_version": 3,
  "name": "Foo",
  "description": "Foo for the web",
  "version": "1.0.0",
  "update_url": "https://clients2.google.com/service/update2/crx",
  "content_scripts": [
    {
      "matches": ["https://web.example/*"],
      "css": ["foo.css"],
      "js": ["content.js"]
    }
  ]
}"#;

/// Stylesheet used by the end-to-end scenarios.
pub const STYLESHEET: &str = ".foo-panel { color: #123456; }";

/// Popup page used by the end-to-end scenarios.
pub const POPUP: &str =
    r#"<html><title>Foo</title><body data-api="https://old.example/api">Welcome to Foo</body></html>"#;

/// Icon bytes the scenarios start with.
pub const OLD_ICON: &[u8] = b"\x89PNG\r\n\x1a\nold-icon";

/// Icon bytes served by [`MemoryFetcher`].
pub const NEW_ICON: &[u8] = b"\x89PNG\r\n\x1a\nnew-icon";

/// URL the scenarios request the icon from.
pub const ICON_URL: &str = "https://cdn.example/icon.png";

/// Creates a ZIP archive with the given `(path, data)` members.
///
/// A path ending in `/` becomes a directory member.
pub fn create_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("Failed to add directory");
        } else {
            writer.start_file(*name, options).expect("Failed to start file");
            writer.write_all(data).expect("Failed to write data");
        }
    }

    writer.finish().expect("Failed to finish archive").into_inner()
}

/// Wraps an archive in a CRX3 envelope with a `header_len` byte header.
pub fn wrap_crx3(archive: &[u8], header_len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(12 + header_len + archive.len());
    data.extend_from_slice(b"Cr24");
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(&(header_len as u32).to_le_bytes());
    data.extend(std::iter::repeat_n(0xA5u8, header_len));
    data.extend_from_slice(archive);
    data
}

/// The end-to-end scenario archive: manifest, stylesheet, icon and popup.
pub fn scenario_archive() -> Vec<u8> {
    create_zip(&[
        ("manifest.json", MANIFEST.as_bytes()),
        ("foo.css", STYLESHEET.as_bytes()),
        ("icons/", b""),
        ("icons/icon.png", OLD_ICON),
        ("popup.html", POPUP.as_bytes()),
    ])
}

/// The end-to-end scenario archive wrapped in a container.
pub fn scenario_container() -> Vec<u8> {
    wrap_crx3(&scenario_archive(), 64)
}

/// Reads every member of an archive into `(path, data)` pairs.
pub fn read_members(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let image = relabel::ArchiveImage::from_zip_bytes(archive).expect("Failed to read archive");
    image
        .iter()
        .map(|m| (m.path.to_string(), m.data.clone()))
        .collect()
}

/// Reads one member of an archive as text.
pub fn read_text(archive: &[u8], path: &str) -> String {
    let image = relabel::ArchiveImage::from_zip_bytes(archive).expect("Failed to read archive");
    let member = image.get(path).unwrap_or_else(|| panic!("missing member {path}"));
    member.text().expect("member is not text").to_string()
}

/// An in-memory [`Fetcher`] that records every request.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    containers: HashMap<String, Vec<u8>>,
    resources: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `container` for `extension_id`.
    pub fn with_container(mut self, extension_id: &str, container: Vec<u8>) -> Self {
        self.containers.insert(extension_id.to_string(), container);
        self
    }

    /// Serves `data` at `url`.
    pub fn with_resource(mut self, url: &str, data: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(url.to_string(), data.into());
        self
    }

    /// Returns every URL or id requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn resource(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "HTTP 404 Not Found"))
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_container(&self, extension_id: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(extension_id.to_string());
        self.containers
            .get(extension_id)
            .cloned()
            .ok_or_else(|| Error::fetch(extension_id, "HTTP 404 Not Found"))
    }

    fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.resource(url)
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.resource(url)?;
        String::from_utf8(bytes).map_err(|e| Error::fetch(url, e))
    }
}
