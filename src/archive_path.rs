//! Validated member paths for archive images.

use crate::{Error, Result};
use std::fmt;

/// Maximum length for member paths (in bytes).
const MAX_PATH_LENGTH: usize = 32768;

/// A validated member path inside an archive.
///
/// `ArchivePath` always uses forward slashes and validates that:
/// - No NUL bytes are present
/// - The path is not absolute (does not start with `/`)
/// - No empty segments exist (no `//` or trailing `/`)
/// - No `.` or `..` segments are present
///
/// Directory members are stored without their trailing slash; the directory
/// flag lives on the member itself.
///
/// # Examples
///
/// ```
/// use relabel::ArchivePath;
///
/// let path = ArchivePath::new("css/foo.css").unwrap();
/// assert_eq!(path.file_name(), "foo.css");
/// assert_eq!(path.extension(), Some("css"));
///
/// assert!(ArchivePath::new("../escape.js").is_err());
/// assert!(ArchivePath::new("/etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchivePath(String);

impl ArchivePath {
    /// Creates a new `ArchivePath` from a string, validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchivePath`] if the path is empty, absolute,
    /// contains NUL bytes, empty segments, or `.`/`..` segments.
    pub fn new(s: &str) -> Result<Self> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }

    /// Creates a path from a raw ZIP entry name.
    ///
    /// ZIP directory entries carry a trailing `/`, which is stripped. The
    /// returned flag is `true` for directory entries.
    pub fn from_zip_name(name: &str) -> Result<(Self, bool)> {
        match name.strip_suffix('/') {
            Some(dir) => Ok((Self::new(dir)?, true)),
            None => Ok((Self::new(name)?, false)),
        }
    }

    /// Wraps a raw entry name without validating it.
    ///
    /// Only used for members that are carried through unchanged.
    pub(crate) fn verbatim(name: &str) -> Self {
        Self(name.to_string())
    }

    fn validate(s: &str) -> Result<()> {
        if s.contains('\0') {
            return Err(Error::InvalidArchivePath("contains NUL byte".into()));
        }

        if s.is_empty() {
            return Err(Error::InvalidArchivePath("empty path".into()));
        }

        if s.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidArchivePath(format!(
                "path exceeds maximum length of {} bytes",
                MAX_PATH_LENGTH
            )));
        }

        if s.starts_with('/') {
            return Err(Error::InvalidArchivePath(format!(
                "absolute path not allowed: {s}"
            )));
        }

        for segment in s.split('/') {
            if segment.is_empty() {
                return Err(Error::InvalidArchivePath(format!(
                    "empty segment in '{s}'"
                )));
            }
            if segment == "." || segment == ".." {
                return Err(Error::InvalidArchivePath(format!(
                    "'{segment}' segment not allowed in '{s}'"
                )));
            }
        }

        Ok(())
    }

    /// Returns the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory prefix of this path including the trailing `/`,
    /// or an empty string for top-level members.
    pub fn dir_prefix(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..=idx],
            None => "",
        }
    }

    /// Returns the file name (last segment) of this path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns a sibling path with the last segment replaced.
    pub fn with_file_name(&self, name: &str) -> Result<Self> {
        Self::new(&format!("{}{}", self.dir_prefix(), name))
    }

    /// Returns the file extension, if any.
    ///
    /// A file name starting with a dot (e.g. `.gitignore`) has no extension.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.file_name();
        let dot_pos = file_name.rfind('.')?;
        if dot_pos == 0 {
            None
        } else {
            Some(&file_name[dot_pos + 1..])
        }
    }

}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ArchivePath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl serde::Serialize for ArchivePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert!(ArchivePath::new("manifest.json").is_ok());
        assert!(ArchivePath::new("label/icons/icon.png").is_ok());
        assert!(ArchivePath::new("_locales/en/messages.json").is_ok());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(ArchivePath::new("").is_err());
        assert!(ArchivePath::new("/abs.js").is_err());
        assert!(ArchivePath::new("a//b.js").is_err());
        assert!(ArchivePath::new("a/./b.js").is_err());
        assert!(ArchivePath::new("a/../../b.js").is_err());
        assert!(ArchivePath::new("nul\0byte").is_err());
    }

    #[test]
    fn test_from_zip_name_directory() {
        let (path, is_dir) = ArchivePath::from_zip_name("label/icons/").unwrap();
        assert!(is_dir);
        assert_eq!(path.as_str(), "label/icons");

        let (path, is_dir) = ArchivePath::from_zip_name("popup.html").unwrap();
        assert!(!is_dir);
        assert_eq!(path.as_str(), "popup.html");

        assert!(ArchivePath::from_zip_name("./extra.txt").is_err());
    }

    #[test]
    fn test_dir_prefix_and_sibling() {
        let path = ArchivePath::new("css/WaSpeed.css").unwrap();
        assert_eq!(path.dir_prefix(), "css/");
        assert_eq!(
            path.with_file_name("waturbo.css").unwrap().as_str(),
            "css/waturbo.css"
        );

        let top = ArchivePath::new("foo.css").unwrap();
        assert_eq!(top.dir_prefix(), "");
        assert_eq!(top.with_file_name("bar.css").unwrap().as_str(), "bar.css");
    }

    #[test]
    fn test_extension() {
        assert_eq!(ArchivePath::new("a/b.JS").unwrap().extension(), Some("JS"));
        assert_eq!(ArchivePath::new("README").unwrap().extension(), None);
        assert_eq!(ArchivePath::new(".gitignore").unwrap().extension(), None);
    }
}
