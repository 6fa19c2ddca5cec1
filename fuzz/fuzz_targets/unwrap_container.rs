//! Fuzz target for container unwrapping and archive loading.
//!
//! Feeds arbitrary bytes through the same steps a downloaded container goes
//! through: inspection, unwrapping and loading into an archive image.
//!
//! Run with: cargo +nightly fuzz run unwrap_container

#![no_main]

use libfuzzer_sys::fuzz_target;
use relabel::container::{ZIP_SIGNATURE, inspect, unwrap_container};
use relabel::image::{ArchiveImage, WriteOptions};

fuzz_target!(|data: &[u8]| {
    let info = inspect(data);
    assert_eq!(info.size, data.len());

    let Ok(archive) = unwrap_container(data) else {
        return;
    };

    // The unwrapped slice is a suffix starting at the first signature
    assert!(archive.starts_with(&ZIP_SIGNATURE));
    assert_eq!(Some(data.len() - archive.len()), info.archive_offset);

    // Loading must fail cleanly, and a loaded image must serialize again
    if let Ok(image) = ArchiveImage::from_zip_bytes(archive) {
        let bytes = image
            .to_zip_bytes(&WriteOptions::default())
            .expect("loaded image failed to serialize");
        let reloaded = ArchiveImage::from_zip_bytes(&bytes).expect("serialized image failed to load");
        assert_eq!(reloaded.len(), image.len());
    }
});
