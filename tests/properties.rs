//! Property-based tests using proptest.
//!
//! These tests check invariants of the unwrapper, the literal rule engine and
//! the manifest patcher over randomly generated inputs.

use proptest::prelude::*;
use relabel::container::{ZIP_SIGNATURE, unwrap_container};
use relabel::manifest::{BrandTokens, patch_manifest};
use relabel::{ReplacementRule, RuleSet};
use serde_json::json;

/// Strategy for envelope bytes that cannot contain a ZIP signature.
fn envelope_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>().prop_filter("no 'P'", |b| *b != b'P'), 1..256)
}

fn manifest_text(name: &str, description: &str, css: &[String], update_url: bool) -> String {
    let mut manifest = json!({
        "manifest_version": 3,
        "name": name,
        "description": description,
        "version": "1.0.0",
        "content_scripts": [{ "matches": ["<all_urls>"], "css": css }],
    });
    if update_url {
        manifest["update_url"] = json!("https://clients2.google.com/service/update2/crx");
    }
    serde_json::to_string(&manifest).unwrap()
}

proptest! {
    /// The unwrapper returns exactly the bytes from the first signature on.
    #[test]
    fn unwrap_returns_archive_suffix(
        envelope in envelope_strategy(),
        body in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut archive = ZIP_SIGNATURE.to_vec();
        archive.extend_from_slice(&body);
        let mut container = envelope.clone();
        container.extend_from_slice(&archive);

        let unwrapped = unwrap_container(&container).unwrap();
        prop_assert_eq!(unwrapped, archive.as_slice());
        prop_assert_eq!(container.len() - unwrapped.len(), envelope.len());
    }

    /// Input without a signature is always rejected.
    #[test]
    fn unwrap_rejects_missing_signature(data in envelope_strategy()) {
        prop_assert!(unwrap_container(&data).is_err());
    }

    /// A bare archive is never treated as wrapped.
    #[test]
    fn unwrap_rejects_bare_archive(body in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut archive = ZIP_SIGNATURE.to_vec();
        archive.extend_from_slice(&body);
        prop_assert!(unwrap_container(&archive).is_err());
    }

    /// With disjoint alphabets, a rule leaves no occurrence behind and a second
    /// pass changes nothing.
    #[test]
    fn rule_application_is_idempotent(
        old in "[a-c]{1,3}",
        new in "[x-z]{1,3}",
        text in "[a-cx-z ]{0,64}",
    ) {
        let rules = RuleSet::compile(&[ReplacementRule::new(old.clone(), new)]).unwrap();

        let once = rules.apply(&text).text.into_owned();
        prop_assert!(!once.contains(&old));

        let twice = rules.apply(&once);
        prop_assert!(!twice.changed());
        prop_assert_eq!(twice.text.as_ref(), once.as_str());
    }

    /// A rule fires exactly when its pattern occurs in the input.
    #[test]
    fn rule_fires_iff_pattern_present(
        old in "[a-c]{1,3}",
        new in "[x-z]{1,3}",
        text in "[a-cx-z ]{0,64}",
    ) {
        let rules = RuleSet::compile(&[ReplacementRule::new(old.clone(), new)]).unwrap();
        let applied = rules.apply(&text);
        prop_assert_eq!(applied.changed(), text.contains(&old));
        prop_assert_eq!(applied.fired.len(), usize::from(text.contains(&old)));
    }

    /// Patching an already patched manifest is a no-op.
    #[test]
    fn manifest_patch_is_idempotent(
        old in "[A-C][a-c]{0,4}",
        new in "[X-Z][x-z]{0,4}",
        name in "[A-Ca-c ]{0,16}",
        description in "[A-Ca-c ]{0,32}",
        css in proptest::collection::vec("[a-c]{1,5}\\.css", 0..4),
        update_url in any::<bool>(),
    ) {
        let brand = BrandTokens::new(old, new);
        let text = manifest_text(&name, &description, &css, update_url);

        let first = patch_manifest(&text, Some(&brand)).unwrap();
        prop_assert!(!first.text.contains("update_url"));

        let second = patch_manifest(&first.text, Some(&brand)).unwrap();
        prop_assert!(!second.changed);
        prop_assert!(second.edits.is_empty());
        prop_assert_eq!(second.text, first.text);
    }

    /// Without brand tokens the patcher only drops the update URL.
    #[test]
    fn manifest_patch_without_brand_keeps_fields(
        name in "[A-Za-z ]{0,16}",
        css in proptest::collection::vec("[a-z]{1,5}\\.css", 0..4),
    ) {
        let text = manifest_text(&name, "", &css, true);
        let patched = patch_manifest(&text, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&patched.text).unwrap();

        prop_assert!(patched.changed);
        prop_assert_eq!(value["name"].as_str(), Some(name.as_str()));
        prop_assert_eq!(value["content_scripts"][0]["css"].clone(), json!(css));
        prop_assert!(value.get("update_url").is_none());
    }
}
