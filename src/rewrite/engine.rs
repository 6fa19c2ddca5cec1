//! The rewrite engine.

use std::borrow::Cow;

use crate::image::{ArchiveImage, Member};
use crate::manifest::{BrandTokens, patch_manifest};
use crate::rules::RuleSet;
use crate::{ArchivePath, Error, Result};

use super::ledger::{Change, ModificationLedger, ModificationRecord};

/// Default path of the icon asset replaced by the engine.
pub const DEFAULT_ICON_PATH: &str = "label/icons/icon.png";

/// Default manifest member name.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Extensions of members that go through the text pipeline.
pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &["js", "json", "html", "htm", "css", "txt"];

/// Options controlling which members the engine touches.
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Path of the icon member to replace.
    pub icon_path: String,
    /// Name of the manifest member (matched case-insensitively).
    pub manifest_name: String,
    /// Text member extensions, without the leading dot.
    pub text_extensions: Vec<String>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            icon_path: DEFAULT_ICON_PATH.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            text_extensions: DEFAULT_TEXT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl RewriteOptions {
    /// Creates options with the default paths and extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the icon member path.
    pub fn icon_path(mut self, path: impl Into<String>) -> Self {
        self.icon_path = path.into();
        self
    }

    /// Sets the manifest member name.
    pub fn manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    /// Replaces the list of text extensions.
    pub fn text_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if `path` has one of the text extensions.
    pub fn is_text_path(&self, path: &ArchivePath) -> bool {
        path.extension().is_some_and(|ext| {
            self.text_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
    }

    /// Returns `true` if `path` is the manifest member.
    pub fn is_manifest_path(&self, path: &ArchivePath) -> bool {
        path.as_str().eq_ignore_ascii_case(&self.manifest_name)
    }
}

/// Rewrites an archive image in place and records every change.
///
/// Steps run in a fixed order: icon substitution, stylesheet rename, then
/// the per-member text pipeline (manifest patch, URL rules, text rules).
/// Failures inside a single member are logged and leave that member as it
/// was.
///
/// # Example
///
/// ```rust
/// use relabel::image::{ArchiveImage, Member};
/// use relabel::rewrite::Rewriter;
/// use relabel::rules::{ReplacementRule, RuleSet};
/// use relabel::ArchivePath;
///
/// let mut image = ArchiveImage::new();
/// image.insert(Member::file(ArchivePath::new("popup.html")?, "<h1>Foo</h1>"));
///
/// let text_rules = RuleSet::compile(&[ReplacementRule::new("Foo", "Bar")])?;
/// let rewriter = Rewriter::new(RuleSet::default(), text_rules);
/// let ledger = rewriter.rewrite(&mut image, None);
///
/// assert_eq!(ledger.len(), 1);
/// assert_eq!(image.get("popup.html").unwrap().data, b"<h1>Bar</h1>");
/// # Ok::<(), relabel::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Rewriter {
    options: RewriteOptions,
    url_rules: RuleSet,
    text_rules: RuleSet,
    brand: Option<BrandTokens>,
}

impl Rewriter {
    /// Creates a rewriter.
    ///
    /// Brand tokens default to the first text rule.
    pub fn new(url_rules: RuleSet, text_rules: RuleSet) -> Self {
        let brand = text_rules
            .rules()
            .next()
            .map(|rule| BrandTokens::new(rule.old.clone(), rule.new.clone()));
        Self {
            options: RewriteOptions::default(),
            url_rules,
            text_rules,
            brand,
        }
    }

    /// Sets the rewrite options.
    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets explicit brand tokens, overriding the first text rule.
    pub fn with_brand(mut self, brand: BrandTokens) -> Self {
        self.brand = Some(brand);
        self
    }

    /// Returns the rewrite options.
    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// Returns the brand tokens in effect, if any.
    pub fn brand(&self) -> Option<&BrandTokens> {
        self.brand.as_ref().filter(|brand| !brand.old.is_empty())
    }

    /// Returns `true` if `image` has a member the icon would replace.
    ///
    /// Callers use this to skip fetching an icon nobody needs.
    pub fn needs_icon(&self, image: &ArchiveImage) -> bool {
        image
            .get(&self.options.icon_path)
            .is_some_and(|member| !member.is_directory && !member.verbatim)
    }

    /// Rewrites `image` and returns the ledger.
    pub fn rewrite(&self, image: &mut ArchiveImage, icon: Option<&[u8]>) -> ModificationLedger {
        let mut ledger = ModificationLedger::new();

        self.replace_icon(image, icon, &mut ledger);

        let snapshot = image.paths();
        let renamed = self.rename_stylesheet(image, &mut ledger);

        for path in snapshot {
            if renamed.as_ref() == Some(&path) || !self.options.is_text_path(&path) {
                continue;
            }
            let Some(member) = image.get(path.as_str()) else {
                continue;
            };
            if member.is_directory || member.verbatim {
                continue;
            }

            let (text, changes) = match self.rewrite_member(member) {
                Ok(Some(rewritten)) => rewritten,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Leaving '{}' unmodified: {}", path, e);
                    continue;
                }
            };

            if let Err(e) = image.replace_data(path.as_str(), text) {
                log::warn!("Leaving '{}' unmodified: {}", path, e);
                continue;
            }
            log::debug!("Rewrote '{}' ({} changes)", path, changes.len());
            ledger.push(ModificationRecord::new(path, changes));
        }

        log::info!(
            "Rewrite finished: {} members modified, {} changes",
            ledger.len(),
            ledger.change_count()
        );
        ledger
    }

    fn replace_icon(&self, image: &mut ArchiveImage, icon: Option<&[u8]>, ledger: &mut ModificationLedger) {
        let path = &self.options.icon_path;
        let Some(member) = image.get(path).filter(|m| !m.verbatim) else {
            log::debug!("No icon member at '{}'", path);
            return;
        };
        let Some(icon) = icon else {
            log::debug!("No icon supplied, keeping '{}'", path);
            return;
        };

        let member_path = member.path.clone();
        match image.replace_data(path, icon) {
            Ok(()) => ledger.record(member_path, Change::IconReplaced),
            Err(e) => log::warn!("Could not replace icon: {}", e),
        }
    }

    /// Moves the brand stylesheet to its new name. Returns the new path.
    fn rename_stylesheet(&self, image: &mut ArchiveImage, ledger: &mut ModificationLedger) -> Option<ArchivePath> {
        let brand = self.brand()?;
        let old_name = brand.old_stylesheet();
        let new_name = brand.new_stylesheet();

        let member = image.find(|m| {
            !m.is_directory && !m.verbatim && m.path.as_str().to_lowercase().contains(&old_name)
        })?;

        if let Err(e) = member.text() {
            log::warn!("Not renaming stylesheet: {}", e);
            return None;
        }

        let from = member.path.clone();
        let to = match from.with_file_name(&new_name) {
            Ok(to) => to,
            Err(e) => {
                log::warn!("Not renaming '{}': {}", from, e);
                return None;
            }
        };
        if to == from {
            return None;
        }

        if let Err(e) = image.rename(from.as_str(), to.clone()) {
            log::warn!("Not renaming '{}': {}", from, e);
            return None;
        }
        log::debug!("Renamed '{}' to '{}'", from, to);
        ledger.record(from, Change::Renamed { to: to.clone() });
        Some(to)
    }

    /// Runs the text pipeline over one member.
    ///
    /// Returns `None` when nothing changed.
    fn rewrite_member(&self, member: &Member) -> Result<Option<(String, Vec<Change>)>> {
        let original = member.text()?;
        let mut text = Cow::Borrowed(original);
        let mut changes = Vec::new();

        if self.options.is_manifest_path(&member.path) {
            let patched = patch_manifest(original, self.brand())
                .map_err(|e| Error::member(member.path.as_str(), e))?;
            if patched.changed {
                log::debug!("Manifest edits: {:?}", patched.edits);
                changes.push(Change::ManifestPatched);
                text = Cow::Owned(patched.text);
            }
        }

        for rules in [&self.url_rules, &self.text_rules] {
            let applied = rules.apply(&text);
            if !applied.changed() {
                continue;
            }
            changes.extend(applied.fired.iter().map(|rule| Change::replaced(rule)));
            let next = applied.text.into_owned();
            text = Cow::Owned(next);
        }

        if changes.is_empty() {
            return Ok(None);
        }
        Ok(Some((text.into_owned(), changes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ReplacementRule;

    fn path(s: &str) -> ArchivePath {
        ArchivePath::new(s).unwrap()
    }

    fn image(members: &[(&str, &str)]) -> ArchiveImage {
        let mut image = ArchiveImage::new();
        for (name, data) in members {
            image.insert(Member::file(path(name), data.as_bytes()));
        }
        image
    }

    fn rules(pairs: &[(&str, &str)]) -> RuleSet {
        let rules: Vec<_> = pairs
            .iter()
            .map(|(old, new)| ReplacementRule::new(*old, *new))
            .collect();
        RuleSet::compile(&rules).unwrap()
    }

    #[test]
    fn test_text_extension_matching() {
        let options = RewriteOptions::default();
        assert!(options.is_text_path(&path("a/b.JS")));
        assert!(options.is_text_path(&path("index.htm")));
        assert!(!options.is_text_path(&path("icon.png")));
        assert!(!options.is_text_path(&path("LICENSE")));
        assert!(options.is_manifest_path(&path("Manifest.JSON")));
        assert!(!options.is_manifest_path(&path("sub/manifest.json")));
    }

    #[test]
    fn test_icon_replaced_when_present() {
        let mut image = image(&[("label/icons/icon.png", "old")]);
        let rewriter = Rewriter::new(RuleSet::default(), RuleSet::default());
        assert!(rewriter.needs_icon(&image));

        let ledger = rewriter.rewrite(&mut image, Some(&b"new icon"[..]));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0].changes, vec![Change::IconReplaced]);
        assert_eq!(image.get("label/icons/icon.png").unwrap().data, b"new icon");
    }

    #[test]
    fn test_missing_icon_member_is_skipped() {
        let mut image = image(&[("icons/other.png", "x")]);
        let rewriter = Rewriter::new(RuleSet::default(), RuleSet::default());
        assert!(!rewriter.needs_icon(&image));

        let ledger = rewriter.rewrite(&mut image, Some(&b"new icon"[..]));
        assert!(ledger.is_empty());
        assert_eq!(image.len(), 1);
    }

    #[test]
    fn test_stylesheet_renamed_in_place() {
        let mut image = image(&[
            ("a.js", "1"),
            ("css/Foo.css", ".foo { color: red }"),
            ("z.js", "2"),
        ]);
        let rewriter = Rewriter::new(RuleSet::default(), rules(&[("Foo", "Bar")]));
        let ledger = rewriter.rewrite(&mut image, None);

        let paths: Vec<_> = image.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, ["a.js", "css/bar.css", "z.js"]);
        assert_eq!(image.get("css/bar.css").unwrap().data, b".foo { color: red }");

        let record = ledger.get("css/Foo.css").unwrap();
        assert_eq!(record.changes, vec![Change::Renamed { to: path("css/bar.css") }]);
    }

    #[test]
    fn test_renamed_stylesheet_is_not_reprocessed() {
        let mut image = image(&[("foo.css", "/* Foo */")]);
        let rewriter = Rewriter::new(RuleSet::default(), rules(&[("Foo", "Bar")]));
        let ledger = rewriter.rewrite(&mut image, None);

        assert_eq!(ledger.len(), 1);
        assert_eq!(image.get("bar.css").unwrap().data, b"/* Foo */");
    }

    #[test]
    fn test_explicit_brand_overrides_first_rule() {
        let mut image = image(&[("acme.css", "x"), ("foo.css", "y")]);
        let rewriter = Rewriter::new(RuleSet::default(), rules(&[("Foo", "Bar")]))
            .with_brand(BrandTokens::new("Acme", "Nova"));
        rewriter.rewrite(&mut image, None);

        assert!(image.contains("nova.css"));
        assert!(image.contains("foo.css"));
    }

    #[test]
    fn test_url_rules_run_before_text_rules() {
        let mut image = image(&[("app.js", "fetch('https://old.test/Foo')")]);
        let rewriter = Rewriter::new(
            rules(&[("https://old.test", "https://new.test")]),
            rules(&[("Foo", "Bar")]),
        );
        let ledger = rewriter.rewrite(&mut image, None);

        assert_eq!(image.get("app.js").unwrap().data, b"fetch('https://new.test/Bar')");
        let changes: Vec<_> = ledger.records()[0]
            .changes
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(changes, ["https://old.test -> https://new.test", "Foo -> Bar"]);
    }

    #[test]
    fn test_binary_and_invalid_members_untouched() {
        let mut image = image(&[("logo.png", "Foo")]);
        image.insert(Member::file(path("broken.js"), vec![0x46, 0x6F, 0x6F, 0xFF]));
        image.insert(Member::file(path("ok.txt"), "Foo"));
        let rewriter = Rewriter::new(RuleSet::default(), rules(&[("Foo", "Bar")]));
        let ledger = rewriter.rewrite(&mut image, None);

        assert_eq!(ledger.len(), 1);
        assert_eq!(image.get("logo.png").unwrap().data, b"Foo");
        assert_eq!(image.get("broken.js").unwrap().data, [0x46, 0x6F, 0x6F, 0xFF]);
        assert_eq!(image.get("ok.txt").unwrap().data, b"Bar");
    }

    #[test]
    fn test_invalid_manifest_left_unmodified() {
        let mut image = image(&[("manifest.json", "{ Foo"), ("a.js", "Foo")]);
        let rewriter = Rewriter::new(RuleSet::default(), rules(&[("Foo", "Bar")]));
        let ledger = rewriter.rewrite(&mut image, None);

        assert_eq!(image.get("manifest.json").unwrap().data, b"{ Foo");
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get("a.js").is_some());
    }

    #[test]
    fn test_manifest_patched_without_rules() {
        let manifest = "{\n  \"name\": \"Foo\",\n  \"update_url\": \"https://u.test\"\n}";
        let mut image = image(&[("manifest.json", manifest)]);
        let rewriter = Rewriter::new(RuleSet::default(), RuleSet::default());
        let ledger = rewriter.rewrite(&mut image, None);

        assert_eq!(ledger.records()[0].changes, vec![Change::ManifestPatched]);
        let text = image.get("manifest.json").unwrap().text().unwrap().to_string();
        assert_eq!(text, "{\n  \"name\": \"Foo\"\n}");
    }

    #[test]
    fn test_verbatim_members_untouched() {
        let mut image = image(&[("popup.html", "Foo")]);
        let mut odd = Member::file(ArchivePath::verbatim("./foo.css"), "Foo");
        odd.verbatim = true;
        image.insert(odd);

        let rewriter = Rewriter::new(RuleSet::default(), rules(&[("Foo", "Bar")]));
        let ledger = rewriter.rewrite(&mut image, None);

        assert_eq!(ledger.len(), 1);
        assert!(ledger.get("popup.html").is_some());
        assert_eq!(image.get("./foo.css").unwrap().data, b"Foo");
        assert!(!image.contains("bar.css"));
    }

    #[test]
    fn test_nothing_to_do() {
        let mut image = image(&[("a.js", "plain"), ("b.png", "PNG")]);
        let rewriter = Rewriter::new(rules(&[("absent", "x")]), RuleSet::default());
        assert!(rewriter.rewrite(&mut image, None).is_empty());
    }
}
