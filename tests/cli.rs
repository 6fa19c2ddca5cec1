//! CLI command integration tests.
//!
//! These tests verify the core functionality that CLI commands would use.
//! Tests use library functions directly rather than subprocess execution.

use std::path::PathBuf;
use tempfile::TempDir;

use relabel::container::{ContainerFormat, inspect, unwrap_container};
use relabel::transport::decode_request;
use relabel::{
    ArchiveImage, BrandTokens, Error, Pipeline, PipelineConfig, ReplacementRule, RewriteOptions,
};

mod common;

use common::{ICON_URL, MemoryFetcher, NEW_ICON};

/// Writes bytes to a file inside a fresh temporary directory.
fn write_temp(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join(name);
    std::fs::write(&path, bytes).expect("Failed to write file");
    (temp_dir, path)
}

// =============================================================================
// Unwrap Command Tests
// =============================================================================

#[test]
fn test_unwrap_to_file() {
    let archive = common::scenario_archive();
    let (temp_dir, container_path) = write_temp("ext.crx", &common::wrap_crx3(&archive, 32));

    let container = std::fs::read(&container_path).unwrap();
    let unwrapped = unwrap_container(&container).unwrap();
    let output = temp_dir.path().join("ext.zip");
    std::fs::write(&output, unwrapped).unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, archive);
    assert_eq!(common::read_members(&written).len(), 5);
}

#[test]
fn test_unwrap_nonexistent_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = std::fs::read(temp_dir.path().join("missing.crx")).map_err(Error::from);
    assert!(matches!(result, Err(Error::Io(_))));
}

// =============================================================================
// Inspect Command Tests
// =============================================================================

#[test]
fn test_inspect_crx3() {
    let container = common::scenario_container();
    let info = inspect(&container);

    assert_eq!(info.format, ContainerFormat::Crx3);
    assert_eq!(info.size, container.len());
    assert_eq!(info.declared_offset, Some(12 + 64));
    assert_eq!(info.archive_offset, Some(12 + 64));
    assert!(!info.offsets_disagree());
}

#[test]
fn test_inspect_lists_members() {
    let container = common::scenario_container();
    let image = ArchiveImage::from_zip_bytes(unwrap_container(&container).unwrap()).unwrap();

    let paths: Vec<_> = image.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, ["manifest.json", "foo.css", "icons", "icons/icon.png", "popup.html"]);
    assert!(image.get("icons").unwrap().is_directory);
}

#[test]
fn test_inspect_bare_archive() {
    let info = inspect(&common::scenario_archive());
    assert_eq!(info.format, ContainerFormat::Zip);
    assert_eq!(info.archive_offset, Some(0));
}

// =============================================================================
// Rebrand Command Tests
// =============================================================================

#[test]
fn test_request_file() {
    let body = br#"{
        "iconUrl": "https://cdn.example/icon.png",
        "urlReplacements": [{"old": "foo.example", "new": "bar.example"}],
        "textReplacements": [{"old": "Foo", "new": "Bar"}],
        "brand": {"old": "Foo", "new": "Bar"}
    }"#;
    let (_temp_dir, path) = write_temp("request.json", body);

    let request = decode_request(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(request.icon_url.as_deref(), Some(ICON_URL));
    assert_eq!(request.url_rules, [ReplacementRule::new("foo.example", "bar.example")]);
    assert_eq!(request.text_rules, [ReplacementRule::new("Foo", "Bar")]);
    assert_eq!(request.brand, Some(BrandTokens::new("Foo", "Bar")));
}

#[test]
fn test_empty_request_file() {
    let (_temp_dir, path) = write_temp("request.json", b"\n");
    let request = decode_request(&std::fs::read(path).unwrap()).unwrap();
    assert!(request.text_rules.is_empty());
    assert!(request.icon_url.is_none());
}

#[test]
fn test_invalid_request_file() {
    let (_temp_dir, path) = write_temp("request.json", b"{\"textReplacements\": 3}");
    let err = decode_request(&std::fs::read(path).unwrap()).unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_rule_flags_parse() {
    let rule: ReplacementRule = "Foo=Bar".parse().unwrap();
    assert_eq!(rule, ReplacementRule::new("Foo", "Bar"));

    let rule: ReplacementRule = "a=b=c".parse().unwrap();
    assert_eq!(rule, ReplacementRule::new("a", "b=c"));

    assert!("no-separator".parse::<ReplacementRule>().is_err());
}

#[test]
fn test_rebrand_local_container_to_file() {
    let (temp_dir, container_path) = write_temp("ext.crx", &common::scenario_container());
    let fetcher = MemoryFetcher::new().with_resource(ICON_URL, NEW_ICON);
    let config = PipelineConfig::new()
        .icon_url(ICON_URL)
        .rewrite(RewriteOptions::new().icon_path("icons/icon.png"));
    let pipeline = Pipeline::new(fetcher, config);
    let request = relabel::RebrandRequest::new().text_rule(ReplacementRule::new("Foo", "Bar"));

    let container = std::fs::read(&container_path).unwrap();
    let outcome = pipeline.run_with_container(container, &request).unwrap();
    let output = temp_dir.path().join("ext_modified.zip");
    std::fs::write(&output, outcome.archive().unwrap()).unwrap();

    let written = std::fs::read(&output).unwrap();
    assert!(common::read_text(&written, "manifest.json").contains(r#""name": "Bar""#));
    assert_eq!(outcome.ledger().unwrap().len(), 4);
}
