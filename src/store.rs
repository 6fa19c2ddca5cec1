//! Store listing check.
//!
//! Reads the published name and version of an extension from its public
//! store page. The page embeds its metadata as JSON fragments, so the first
//! `"version": "..."` and `"name": "..."` pairs are taken.

use regex::Regex;
use serde::Serialize;

use crate::fetch::Fetcher;
use crate::{Error, Result};

/// Default store detail page prefix.
pub const DEFAULT_STORE_URL: &str = "https://chrome.google.com/webstore/detail";

/// Name reported when the page has no name field.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Published metadata of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionListing {
    /// Published extension name.
    pub name: String,
    /// Published version.
    pub version: String,
    /// Store page the data was read from.
    pub store_url: String,
    /// Extension identifier.
    #[serde(rename = "EXTENSION_ID")]
    pub extension_id: String,
}

/// Returns the store page URL for an extension id.
pub fn listing_url(store_url: &str, extension_id: &str) -> String {
    format!("{}/{}", store_url.trim_end_matches('/'), extension_id)
}

fn first_capture(pattern: &str, html: &str) -> Result<Option<String>> {
    let regex = Regex::new(pattern).map_err(|e| Error::StoreListing(e.to_string()))?;
    Ok(regex
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

/// Extracts the name and version from a store page.
///
/// Returns `(name, version)`. The name falls back to [`UNKNOWN_NAME`].
///
/// # Errors
///
/// Returns [`Error::StoreListing`] if the page has no version.
pub fn parse_listing(html: &str) -> Result<(String, String)> {
    let version = first_capture(r#""version":\s*"([^"]+)""#, html)?
        .ok_or_else(|| Error::StoreListing("version not found on store page".into()))?;
    let name = first_capture(r#""name":\s*"([^"]+)""#, html)?
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    Ok((name, version))
}

/// Fetches and parses the store page of `extension_id`.
pub fn check_listing<F: Fetcher>(fetcher: &F, store_url: &str, extension_id: &str) -> Result<ExtensionListing> {
    let url = listing_url(store_url, extension_id);
    let html = fetcher.fetch_text(&url)?;
    let (name, version) = parse_listing(&html)?;
    log::info!("Store lists {} version {}", name, version);
    Ok(ExtensionListing {
        name,
        version,
        store_url: url,
        extension_id: extension_id.to_string(),
    })
}
