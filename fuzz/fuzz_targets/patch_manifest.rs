//! Fuzz target for the manifest patcher.
//!
//! The first byte selects whether brand tokens are applied; the rest is the
//! manifest text.
//!
//! Run with: cargo +nightly fuzz run patch_manifest

#![no_main]

use libfuzzer_sys::fuzz_target;
use relabel::manifest::{BrandTokens, UPDATE_URL_KEY, patch_manifest};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };

    let brand = BrandTokens::new("Foo", "Bar");
    let brand = (selector & 1 == 1).then_some(&brand);

    let Ok(patched) = patch_manifest(text, brand) else {
        return;
    };

    let value: serde_json::Value =
        serde_json::from_str(&patched.text).expect("patched manifest is not valid JSON");
    assert!(value.get(UPDATE_URL_KEY).is_none(), "update_url survived patching");

    // A second pass over patched output must be a no-op
    let again = patch_manifest(&patched.text, brand).expect("patched manifest failed to parse");
    assert!(!again.changed, "patching is not idempotent");
});
