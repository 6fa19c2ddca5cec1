//! Container unwrapping.
//!
//! Browser stores distribute extensions inside a signed envelope (the CRX
//! container) that prepends a variable-length header to a plain ZIP archive.
//! The header length is not something callers can rely on, so the embedded
//! archive is located by scanning for the ZIP local file header signature.
//!
//! ```text
//! +------------------+
//! |  "Cr24" + header |  <- magic, version, keys and signatures
//! +------------------+
//! |   ZIP archive    |  <- starts with PK\x03\x04
//! +------------------+
//! ```
//!
//! Only the *first* occurrence of the signature marks the envelope boundary;
//! the archive itself may contain the same four bytes further on.

use crate::{Error, Result};

/// ZIP local file header signature: 'P' 'K' 0x03 0x04.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// CRX container magic: "Cr24".
pub const CRX_MAGIC: [u8; 4] = *b"Cr24";

/// Detected container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// CRX version 2 (public key and signature in the header).
    Crx2,
    /// CRX version 3 (protobuf header).
    Crx3,
    /// A bare ZIP archive with no envelope.
    Zip,
    /// Unknown or unrecognized data.
    Unknown,
}

impl ContainerFormat {
    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Crx2 => "CRX2",
            ContainerFormat::Crx3 => "CRX3",
            ContainerFormat::Zip => "ZIP",
            ContainerFormat::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Diagnostic information about a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Detected container format.
    pub format: ContainerFormat,
    /// Archive offset computed from the CRX header fields, if they parse.
    pub declared_offset: Option<usize>,
    /// Offset of the first ZIP signature, if any.
    pub archive_offset: Option<usize>,
    /// Total container size in bytes.
    pub size: usize,
}

impl ContainerInfo {
    /// Returns `true` if the header-declared and scanned offsets disagree.
    pub fn offsets_disagree(&self) -> bool {
        matches!(
            (self.declared_offset, self.archive_offset),
            (Some(declared), Some(scanned)) if declared != scanned
        )
    }
}

fn read_u32_le(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Detects the container format from its leading bytes.
pub fn detect_format(data: &[u8]) -> ContainerFormat {
    if data.starts_with(&CRX_MAGIC) {
        return match read_u32_le(data, 4) {
            Some(2) => ContainerFormat::Crx2,
            Some(3) => ContainerFormat::Crx3,
            _ => ContainerFormat::Unknown,
        };
    }
    if data.starts_with(&ZIP_SIGNATURE) {
        return ContainerFormat::Zip;
    }
    ContainerFormat::Unknown
}

/// Computes the archive offset declared by a CRX header.
fn declared_offset(data: &[u8], format: ContainerFormat) -> Option<usize> {
    match format {
        // magic, version, key length, signature length, key, signature
        ContainerFormat::Crx2 => {
            let key_len = read_u32_le(data, 8)? as usize;
            let sig_len = read_u32_le(data, 12)? as usize;
            16usize.checked_add(key_len)?.checked_add(sig_len)
        }
        // magic, version, header length, header
        ContainerFormat::Crx3 => {
            let header_len = read_u32_le(data, 8)? as usize;
            12usize.checked_add(header_len)
        }
        ContainerFormat::Zip => Some(0),
        ContainerFormat::Unknown => None,
    }
}

/// Inspects a container without unwrapping it.
pub fn inspect(data: &[u8]) -> ContainerInfo {
    let format = detect_format(data);
    ContainerInfo {
        format,
        declared_offset: declared_offset(data, format),
        archive_offset: find_archive_offset(data),
        size: data.len(),
    }
}

/// Returns the offset of the first ZIP signature in `data`, if any.
pub fn find_archive_offset(data: &[u8]) -> Option<usize> {
    data.windows(ZIP_SIGNATURE.len())
        .position(|w| w == ZIP_SIGNATURE)
}

/// Returns `true` if `data` is a bare ZIP archive (signature at offset 0).
pub fn is_bare_archive(data: &[u8]) -> bool {
    data.starts_with(&ZIP_SIGNATURE)
}

/// Strips the container envelope and returns the embedded archive.
///
/// The returned slice starts at the first ZIP signature and runs to the end
/// of the input.
///
/// # Errors
///
/// Returns [`Error::SignatureNotFound`] if the signature does not occur, or
/// occurs only at offset 0. A signature at offset 0 means there was no
/// envelope; callers that accept bare archives check [`is_bare_archive`]
/// first and skip unwrapping.
///
/// # Example
///
/// ```
/// use relabel::container::unwrap_container;
///
/// let mut crx = b"Cr24\x03\x00\x00\x00junk".to_vec();
/// crx.extend_from_slice(b"PK\x03\x04rest");
/// assert_eq!(unwrap_container(&crx).unwrap(), b"PK\x03\x04rest");
///
/// assert!(unwrap_container(b"PK\x03\x04bare").is_err());
/// ```
pub fn unwrap_container(data: &[u8]) -> Result<&[u8]> {
    match find_archive_offset(data) {
        Some(offset) if offset > 0 => {
            log::debug!(
                "Found ZIP signature at offset {} of {} byte container",
                offset,
                data.len()
            );
            Ok(&data[offset..])
        }
        Some(_) => {
            log::debug!("ZIP signature at offset 0; input is not wrapped");
            Err(Error::SignatureNotFound {
                scanned: data.len(),
            })
        }
        None => Err(Error::SignatureNotFound {
            scanned: data.len(),
        }),
    }
}
