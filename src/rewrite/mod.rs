//! Archive rewriting.
//!
//! This module applies a rebrand to an in-memory [`ArchiveImage`]:
//! - Replacing the icon asset
//! - Renaming the brand stylesheet
//! - Patching the manifest
//! - Applying URL and text rules to every text member
//!
//! Every change lands in a [`ModificationLedger`], one record per member.
//!
//! # Implementation Notes
//!
//! The text pipeline walks the member list as it was before the stylesheet
//! rename, so the renamed stylesheet keeps its original content.
//!
//! [`ArchiveImage`]: crate::image::ArchiveImage

mod engine;
mod ledger;

pub use engine::{
    DEFAULT_ICON_PATH, DEFAULT_MANIFEST_NAME, DEFAULT_TEXT_EXTENSIONS, RewriteOptions, Rewriter,
};
pub use ledger::{Change, ModificationLedger, ModificationRecord};
