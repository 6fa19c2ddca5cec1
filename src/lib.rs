//! # relabel
//!
//! A library for rebranding packaged browser extensions.
//!
//! Given the identifier of a publicly distributed extension, `relabel`
//! downloads its signed container, strips the envelope to recover the ZIP
//! archive inside, rewrites a fixed set of members (manifest metadata, the
//! brand stylesheet, the icon, and literal text/URL substitutions across every
//! text member) and writes a new archive together with a ledger of every
//! change.
//!
//! ## Quick Start
//!
//! ### Rebranding an Extension
//!
//! ```rust,no_run
//! # #[cfg(feature = "http")]
//! # fn main() -> relabel::Result<()> {
//! use relabel::fetch::HttpFetcher;
//! use relabel::pipeline::{Pipeline, PipelineConfig, PipelineOutcome, RebrandRequest};
//! use relabel::rules::ReplacementRule;
//!
//! let pipeline = Pipeline::new(HttpFetcher::new()?, PipelineConfig::default());
//! let request = RebrandRequest::new()
//!     .url_rule(ReplacementRule::new("https://api.old.example", "https://api.new.example"))
//!     .text_rule(ReplacementRule::new("WaSpeed", "WaTurbo"));
//!
//! if let PipelineOutcome::Modified { archive, ledger, .. } = pipeline.run(&request)? {
//!     std::fs::write("rebranded.zip", archive)?;
//!     for record in &ledger {
//!         println!("{}: {} changes", record.path, record.changes.len());
//!     }
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "http"))]
//! # fn main() {}
//! ```
//!
//! ### Working on a Local Container
//!
//! ```rust,no_run
//! use relabel::container::unwrap_container;
//! use relabel::image::ArchiveImage;
//! use relabel::Result;
//!
//! fn main() -> Result<()> {
//!     let crx = std::fs::read("extension.crx")?;
//!     let image = ArchiveImage::from_zip_bytes(unwrap_container(&crx)?)?;
//!     for member in &image {
//!         println!("{} ({} bytes)", member.path, member.data.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`container`] | Locate the ZIP archive inside a CRX envelope |
//! | [`image`] | In-memory, order-preserving archive image |
//! | [`rules`] | Literal find/replace rules |
//! | [`manifest`] | Manifest patching |
//! | [`rewrite`] | The rewrite engine and its ledger |
//! | [`fetch`] | Remote retrieval |
//! | [`store`] | Store listing check |
//! | [`pipeline`] | Fetch, unwrap, rewrite, serialize |
//! | [`transport`] | Request decoding and response mapping |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `http` | Yes | Blocking HTTP fetcher |
//! | `deflate` | Yes | Deflate compression for output archives |
//! | `cli` | No | The `relabel` command-line tool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive_path;
pub mod container;
pub mod error;
pub mod fetch;
pub mod image;
pub mod manifest;
pub mod pipeline;
pub mod rewrite;
pub mod rules;
pub mod store;
pub mod transport;

pub use archive_path::ArchivePath;
pub use error::{Error, Result};

pub use container::{ContainerFormat, ContainerInfo, unwrap_container};
pub use image::{ArchiveImage, Compression, Member, WriteOptions};
pub use manifest::{BrandTokens, PatchedManifest, patch_manifest};
pub use rewrite::{Change, ModificationLedger, ModificationRecord, RewriteOptions, Rewriter};
pub use rules::{ReplacementRule, RuleSet};

pub use fetch::Fetcher;
#[cfg(feature = "http")]
pub use fetch::{HttpFetcher, HttpFetcherOptions};

pub use pipeline::{
    Pipeline, PipelineConfig, PipelineOutcome, PipelineStats, RebrandRequest, Stage,
};
pub use store::{ExtensionListing, check_listing};
