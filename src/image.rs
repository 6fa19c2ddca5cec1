//! In-memory archive images.
//!
//! An [`ArchiveImage`] holds every member of a ZIP archive in discovery order
//! so that a rewrite can mutate members freely and re-serialize them in a
//! stable order.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::{ArchivePath, Error, Result};

/// Compression applied to members when an image is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Members are stored without compression.
    Stored,
    /// Members are compressed with Deflate.
    #[cfg(feature = "deflate")]
    Deflated,
}

impl Default for Compression {
    fn default() -> Self {
        #[cfg(feature = "deflate")]
        {
            Compression::Deflated
        }
        #[cfg(not(feature = "deflate"))]
        {
            Compression::Stored
        }
    }
}

impl From<Compression> for CompressionMethod {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Stored => CompressionMethod::Stored,
            #[cfg(feature = "deflate")]
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Options for serializing an archive image.
///
/// # Example
///
/// ```rust
/// use relabel::image::{Compression, WriteOptions};
///
/// let options = WriteOptions::new()
///     .compression(Compression::Stored)
///     .deterministic(true);
/// assert!(options.deterministic);
/// ```
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Compression method for content members.
    pub compression: Compression,
    /// Compression level (0-9), `None` for the method's default.
    pub level: Option<u32>,
    /// Reset all member timestamps to the ZIP epoch (1980-01-01).
    pub deterministic: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            level: None,
            deterministic: false,
        }
    }
}

impl WriteOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression method.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the compression level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] if `level` is above 9.
    pub fn level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidCompressionLevel { level });
        }
        self.level = Some(level);
        Ok(self)
    }

    /// Enables deterministic timestamps for reproducible output.
    pub fn deterministic(mut self, enabled: bool) -> Self {
        self.deterministic = enabled;
        self
    }
}

/// One member of an archive image.
#[derive(Debug, Clone)]
pub struct Member {
    /// Validated member path (without a trailing slash for directories).
    pub path: ArchivePath,
    /// Member content. Always empty for directories.
    pub data: Vec<u8>,
    /// Whether this member is a directory entry.
    pub is_directory: bool,
    /// Last modification time as stored in the archive.
    pub modified: DateTime,
    /// Unix permission bits, if the archive recorded them.
    pub unix_mode: Option<u32>,
    /// The entry name failed path validation. Such members are written back
    /// under their original name and never rewritten.
    pub verbatim: bool,
}

impl Member {
    /// Creates a content member with default metadata.
    pub fn file(path: ArchivePath, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            data: data.into(),
            is_directory: false,
            modified: DateTime::default(),
            unix_mode: None,
            verbatim: false,
        }
    }

    /// Creates a directory member with default metadata.
    pub fn directory(path: ArchivePath) -> Self {
        Self {
            path,
            data: Vec::new(),
            is_directory: true,
            modified: DateTime::default(),
            unix_mode: None,
            verbatim: false,
        }
    }

    /// Decodes the member content as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| Error::member(self.path.as_str(), format!("not valid UTF-8: {e}")))
    }
}

/// An ordered, in-memory image of an archive.
///
/// Paths are unique; the order of members is the order in which they were
/// discovered in the source archive, with renames keeping their position and
/// new members appended.
#[derive(Debug, Clone, Default)]
pub struct ArchiveImage {
    members: Vec<Member>,
}

impl ArchiveImage {
    /// Creates an empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an image from ZIP archive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedArchive`] if the bytes are not a readable
    /// ZIP archive. Members with unsafe names are kept as
    /// [`verbatim`](Member::verbatim) members instead.
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut image = Self::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let (path, is_directory, verbatim) = match ArchivePath::from_zip_name(file.name()) {
                Ok((path, is_directory)) => (path, is_directory, false),
                Err(e) => {
                    log::warn!("Carrying '{}' through unchanged: {}", file.name(), e);
                    let name = file.name();
                    let is_directory = name.ends_with('/');
                    let name = name.strip_suffix('/').unwrap_or(name);
                    (ArchivePath::verbatim(name), is_directory, true)
                }
            };

            let mut data = Vec::new();
            if !is_directory {
                // Declared sizes are untrusted; never reserve past the input.
                data.reserve(file.size().min(bytes.len() as u64) as usize);
                file.read_to_end(&mut data).map_err(|e| {
                    Error::MalformedArchive(format!("failed to read '{}': {}", path, e))
                })?;
            }

            let member = Member {
                path,
                data,
                is_directory,
                modified: file.last_modified(),
                unix_mode: file.unix_mode(),
                verbatim,
            };

            if image.contains(member.path.as_str()) {
                log::warn!("Duplicate member '{}', keeping the last copy", member.path);
            }
            image.insert(member);
        }

        log::debug!("Loaded archive image with {} members", image.len());
        Ok(image)
    }

    /// Serializes the image into ZIP archive bytes.
    pub fn to_zip_bytes(&self, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for member in &self.members {
            let modified = if options.deterministic {
                DateTime::default()
            } else {
                member.modified
            };

            let mut file_options = FileOptions::default().last_modified_time(modified);
            if let Some(mode) = member.unix_mode {
                file_options = file_options.unix_permissions(mode);
            }

            if member.is_directory {
                writer.add_directory(member.path.as_str(), file_options)?;
                continue;
            }

            let file_options = file_options
                .compression_method(options.compression.into())
                .compression_level(options.level.map(|level| level as i32));
            writer.start_file(member.path.as_str(), file_options)?;
            writer
                .write_all(&member.data)
                .map_err(|e| Error::MalformedArchive(format!("failed to write '{}': {}", member.path, e)))?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the image has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns all members in order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Returns an iterator over the members in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.members.iter()
    }

    /// Returns the member paths in order.
    pub fn paths(&self) -> Vec<ArchivePath> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }

    /// Returns the index of the member at `path`.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.members.iter().position(|m| m.path.as_str() == path)
    }

    /// Returns `true` if a member exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.position(path).is_some()
    }

    /// Returns the member at `path`.
    pub fn get(&self, path: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.path.as_str() == path)
    }

    /// Returns the first member matching `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<&Member>
    where
        P: FnMut(&Member) -> bool,
    {
        self.members.iter().find(|m| predicate(m))
    }

    /// Inserts a member.
    ///
    /// A member already at the same path is replaced in place; otherwise the
    /// member is appended.
    pub fn insert(&mut self, member: Member) {
        match self.position(member.path.as_str()) {
            Some(idx) => self.members[idx] = member,
            None => self.members.push(member),
        }
    }

    /// Replaces the content of the member at `path`.
    pub fn replace_data(&mut self, path: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let idx = self
            .position(path)
            .ok_or_else(|| Error::member(path, "member not found"))?;
        let member = &mut self.members[idx];
        if member.is_directory {
            return Err(Error::member(path, "cannot write content to a directory"));
        }
        member.data = data.into();
        Ok(())
    }

    /// Moves the member at `from` to the path `to`, keeping its position.
    ///
    /// A different member already at `to` is dropped.
    pub fn rename(&mut self, from: &str, to: ArchivePath) -> Result<()> {
        let idx = self
            .position(from)
            .ok_or_else(|| Error::member(from, "member not found"))?;

        if from == to.as_str() {
            return Ok(());
        }

        if let Some(existing) = self.position(to.as_str()) {
            log::warn!("Rename target '{}' already exists and will be replaced", to);
            self.members.remove(existing);
            let idx = if existing < idx { idx - 1 } else { idx };
            self.members[idx].path = to;
        } else {
            self.members[idx].path = to;
        }
        Ok(())
    }

    /// Returns the total size of all member contents in bytes.
    pub fn content_size(&self) -> u64 {
        self.members.iter().map(|m| m.data.len() as u64).sum()
    }
}

impl<'a> IntoIterator for &'a ArchiveImage {
    type Item = &'a Member;
    type IntoIter = std::slice::Iter<'a, Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
