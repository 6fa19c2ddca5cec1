//! Extension manifest patching.
//!
//! The manifest is parsed as generic JSON with its key order preserved, so a
//! manifest that needs no edits re-serializes to the same text whenever it
//! was already pretty-printed with two-space indentation.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Key of the auto-update directive removed from every manifest.
pub const UPDATE_URL_KEY: &str = "update_url";

/// Old and new brand tokens.
///
/// The product-name rewrite replaces `old` with `new`; the stylesheet rename
/// retargets `lowercase(old).css` to `lowercase(new).css`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BrandTokens {
    /// Brand token being replaced.
    pub old: String,
    /// Replacement brand token.
    pub new: String,
}

impl BrandTokens {
    /// Creates a token pair.
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Stylesheet basename derived from the old token.
    pub fn old_stylesheet(&self) -> String {
        format!("{}.css", self.old.to_lowercase())
    }

    /// Stylesheet basename derived from the new token.
    pub fn new_stylesheet(&self) -> String {
        format!("{}.css", self.new.to_lowercase())
    }
}

/// One semantic edit made to a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEdit {
    /// The auto-update directive was removed.
    RemovedUpdateUrl,
    /// A brand token was replaced inside a top-level string field.
    RenamedField {
        /// Field name (`name` or `description`).
        field: &'static str,
    },
    /// A content script stylesheet path was retargeted.
    RetargetedStylesheet {
        /// Path before the edit.
        from: String,
        /// Path after the edit.
        to: String,
    },
}

/// Result of patching a manifest.
#[derive(Debug, Clone)]
pub struct PatchedManifest {
    /// Re-serialized manifest text.
    pub text: String,
    /// `true` if `text` differs from the input text.
    pub changed: bool,
    /// Semantic edits applied, in order.
    pub edits: Vec<ManifestEdit>,
}

/// Patches a manifest document.
///
/// Removes `update_url`, replaces the old brand token in `name` and
/// `description`, and retargets content script stylesheets whose path ends
/// (case-insensitively) in the old stylesheet basename. Without brand tokens
/// only the update directive is removed.
///
/// # Errors
///
/// Returns [`Error::ManifestParse`] if the text is not a JSON object.
///
/// # Example
///
/// ```rust
/// use relabel::manifest::{patch_manifest, BrandTokens};
///
/// let input = r#"{"name": "Foo Helper", "update_url": "https://u.test"}"#;
/// let patched = patch_manifest(input, Some(&BrandTokens::new("Foo", "Bar")))?;
/// assert!(patched.changed);
/// assert!(patched.text.contains(r#""name": "Bar Helper""#));
/// assert!(!patched.text.contains("update_url"));
/// # Ok::<(), relabel::Error>(())
/// ```
pub fn patch_manifest(text: &str, brand: Option<&BrandTokens>) -> Result<PatchedManifest> {
    let mut root: Value = serde_json::from_str(text)?;
    let manifest = root
        .as_object_mut()
        .ok_or_else(|| Error::ManifestParse("manifest is not a JSON object".into()))?;

    let mut edits = Vec::new();

    if manifest.remove(UPDATE_URL_KEY).is_some() {
        edits.push(ManifestEdit::RemovedUpdateUrl);
    }

    if let Some(brand) = brand.filter(|b| !b.old.is_empty()) {
        for field in ["name", "description"] {
            if replace_in_string_field(manifest, field, &brand.old, &brand.new) {
                edits.push(ManifestEdit::RenamedField { field });
            }
        }
        retarget_stylesheets(
            manifest,
            &brand.old_stylesheet(),
            &brand.new_stylesheet(),
            &mut edits,
        );
    }

    let patched = serde_json::to_string_pretty(&root)?;
    let changed = patched != text;
    Ok(PatchedManifest {
        text: patched,
        changed,
        edits,
    })
}

fn replace_in_string_field(manifest: &mut Map<String, Value>, field: &str, old: &str, new: &str) -> bool {
    match manifest.get_mut(field) {
        Some(Value::String(value)) if value.contains(old) => {
            *value = value.replace(old, new);
            true
        }
        _ => false,
    }
}

fn retarget_stylesheets(
    manifest: &mut Map<String, Value>,
    old_basename: &str,
    new_basename: &str,
    edits: &mut Vec<ManifestEdit>,
) {
    let Some(Value::Array(scripts)) = manifest.get_mut("content_scripts") else {
        return;
    };

    let css_paths = scripts
        .iter_mut()
        .filter_map(|script| match script.get_mut("css") {
            Some(Value::Array(css)) => Some(css),
            _ => None,
        })
        .flatten();

    for entry in css_paths {
        let Value::String(path) = entry else {
            continue;
        };
        if let Some(retargeted) = retarget_path(path, old_basename, new_basename) {
            edits.push(ManifestEdit::RetargetedStylesheet {
                from: path.clone(),
                to: retargeted.clone(),
            });
            *path = retargeted;
        }
    }
}

/// Replaces a case-insensitive `old_basename` suffix of `path`.
fn retarget_path(path: &str, old_basename: &str, new_basename: &str) -> Option<String> {
    if old_basename.is_empty() || path.len() < old_basename.len() {
        return None;
    }
    let split = path.len() - old_basename.len();
    if !path.is_char_boundary(split) || !path[split..].eq_ignore_ascii_case(old_basename) {
        return None;
    }
    let retargeted = format!("{}{}", &path[..split], new_basename);
    (retargeted != path).then_some(retargeted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
  "manifest_version": 3,
  "name": "Foo Helper",
  "description": "Foo makes Foo faster",
  "version": "1.2.3",
  "update_url": "https://clients2.google.com/service/update2/crx",
  "content_scripts": [
    {
      "matches": ["https://web.whatsapp.com/*"],
      "css": ["css/Foo.css", "css/other.css"],
      "js": ["content.js"]
    },
    {
      "matches": ["<all_urls>"]
    }
  ]
}"#;

    fn brand() -> BrandTokens {
        BrandTokens::new("Foo", "Bar")
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_full_patch() {
        let patched = patch_manifest(MANIFEST, Some(&brand())).unwrap();
        assert!(patched.changed);

        let value = parse(&patched.text);
        assert!(value.get(UPDATE_URL_KEY).is_none());
        assert_eq!(value["name"], "Bar Helper");
        assert_eq!(value["description"], "Bar makes Bar faster");
        assert_eq!(value["content_scripts"][0]["css"][0], "css/bar.css");
        assert_eq!(value["content_scripts"][0]["css"][1], "css/other.css");
        assert_eq!(value["version"], "1.2.3");

        assert_eq!(
            patched.edits,
            vec![
                ManifestEdit::RemovedUpdateUrl,
                ManifestEdit::RenamedField { field: "name" },
                ManifestEdit::RenamedField { field: "description" },
                ManifestEdit::RetargetedStylesheet {
                    from: "css/Foo.css".into(),
                    to: "css/bar.css".into(),
                },
            ]
        );
    }

    #[test]
    fn test_field_order_preserved() {
        let patched = patch_manifest(MANIFEST, Some(&brand())).unwrap();
        let keys: Vec<_> = parse(&patched.text)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(
            keys,
            ["manifest_version", "name", "description", "version", "content_scripts"]
        );
    }

    #[test]
    fn test_patch_is_idempotent() {
        let first = patch_manifest(MANIFEST, Some(&brand())).unwrap();
        let second = patch_manifest(&first.text, Some(&brand())).unwrap();
        assert!(!second.changed);
        assert!(second.edits.is_empty());
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_update_url_removal_without_brand() {
        let patched = patch_manifest(MANIFEST, None).unwrap();
        assert_eq!(patched.edits, vec![ManifestEdit::RemovedUpdateUrl]);
        assert_eq!(parse(&patched.text)["name"], "Foo Helper");

        let again = patch_manifest(&patched.text, None).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_pretty_manifest_without_edits_is_unchanged() {
        let input = "{\n  \"name\": \"Other\",\n  \"version\": \"1\"\n}";
        let patched = patch_manifest(input, Some(&brand())).unwrap();
        assert!(!patched.changed);
        assert_eq!(patched.text, input);
    }

    #[test]
    fn test_compact_manifest_registers_as_changed() {
        let patched = patch_manifest(r#"{"name":"Other"}"#, None).unwrap();
        assert!(patched.changed);
        assert!(patched.edits.is_empty());
    }

    #[test]
    fn test_non_string_fields_are_ignored() {
        let input = r#"{"name": 5, "description": null, "content_scripts": [{"css": [1, "foo.css"]}]}"#;
        let patched = patch_manifest(input, Some(&brand())).unwrap();
        let value = parse(&patched.text);
        assert_eq!(value["name"], 5);
        assert_eq!(value["content_scripts"][0]["css"][1], "bar.css");
    }

    #[test]
    fn test_invalid_manifest() {
        assert!(matches!(
            patch_manifest("{not json", None),
            Err(Error::ManifestParse(_))
        ));
        assert!(matches!(
            patch_manifest("[1, 2]", None),
            Err(Error::ManifestParse(_))
        ));
    }

    #[test]
    fn test_retarget_path() {
        assert_eq!(
            retarget_path("styles/FOO.CSS", "foo.css", "bar.css").as_deref(),
            Some("styles/bar.css")
        );
        assert_eq!(retarget_path("foo.css.map", "foo.css", "bar.css"), None);
        assert_eq!(retarget_path("a.css", "foo.css", "bar.css"), None);
        assert_eq!(retarget_path("bar.css", "bar.css", "bar.css"), None);
    }

    #[test]
    fn test_brand_stylesheets_are_lowercase() {
        let brand = BrandTokens::new("WaSpeed", "WaTurbo");
        assert_eq!(brand.old_stylesheet(), "waspeed.css");
        assert_eq!(brand.new_stylesheet(), "waturbo.css");
    }
}
