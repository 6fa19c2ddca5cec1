//! Fuzz target for ArchivePath::new with arbitrary string input.
//!
//! Member names come straight from downloaded archives, and a rename joins
//! them with new file names, so validation must hold for adversarial input.
//!
//! Run with: cargo +nightly fuzz run archive_path

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(path_str) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(path) = relabel::ArchivePath::new(path_str) else {
        return;
    };
    let normalized = path.as_str();

    assert!(!normalized.starts_with('/'), "Absolute path accepted: {:?}", normalized);
    assert!(!normalized.contains('\0'), "NUL byte in path: {:?}", normalized);
    for segment in normalized.split('/') {
        assert!(
            !segment.is_empty() && segment != "." && segment != "..",
            "Invalid segment in path: {:?}",
            normalized
        );
    }

    // Swapping the file name keeps the directory prefix
    if let Ok(renamed) = path.with_file_name("bar.css") {
        assert_eq!(renamed.dir_prefix(), path.dir_prefix());
        assert_eq!(renamed.file_name(), "bar.css");
    }
});
