//! The rebrand pipeline.
//!
//! A run walks a fixed sequence of stages:
//!
//! ```text
//! Idle -> Fetching -> Unwrapping -> Rewriting -> Serializing -> Done
//!            \            \             \             \
//!             +------------+-------------+-------------+--> Failed
//! ```
//!
//! Each transition is logged. Nothing is retried and no partial result is
//! returned: a run either yields a [`PipelineOutcome`] or an [`Error`](crate::Error).
//!
//! # Example
//!
//! ```rust,ignore
//! use relabel::fetch::HttpFetcher;
//! use relabel::pipeline::{Pipeline, PipelineConfig, PipelineOutcome, RebrandRequest};
//! use relabel::rules::ReplacementRule;
//!
//! let pipeline = Pipeline::new(HttpFetcher::new()?, PipelineConfig::default());
//! let request = RebrandRequest::new()
//!     .text_rule(ReplacementRule::new("WaSpeed", "WaTurbo"));
//!
//! match pipeline.run(&request)? {
//!     PipelineOutcome::Modified { archive, ledger, .. } => {
//!         std::fs::write("out.zip", archive)?;
//!         println!("{} members modified", ledger.len());
//!     }
//!     PipelineOutcome::Unmodified { .. } => println!("nothing to change"),
//! }
//! ```

use std::fmt;

use crate::container::{detect_format, is_bare_archive, unwrap_container};
use crate::fetch::Fetcher;
use crate::image::{ArchiveImage, WriteOptions};
use crate::manifest::BrandTokens;
use crate::rewrite::{ModificationLedger, RewriteOptions, Rewriter};
use crate::rules::{ReplacementRule, RuleSet};
use crate::store::{self, DEFAULT_STORE_URL, ExtensionListing};
use crate::Result;

/// Extension rebranded when none is configured.
pub const DEFAULT_EXTENSION_ID: &str = "balkfdkhbcjjmhndnblgmlmcabnapogp";

/// Icon downloaded when a request names none.
pub const DEFAULT_ICON_URL: &str = "https://watidy.vercel.app/_next/image?url=%2Flogo.png&w=256&q=75";

/// Configuration for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Identifier of the extension to fetch.
    pub extension_id: String,
    /// Icon URL used when a request does not name one.
    pub icon_url: String,
    /// Store detail page prefix.
    pub store_url: String,
    /// Rewrite engine options.
    pub rewrite: RewriteOptions,
    /// Output archive options.
    pub write: WriteOptions,
    /// Accept a container that is already a bare archive.
    pub accept_bare_archives: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extension_id: DEFAULT_EXTENSION_ID.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
            store_url: DEFAULT_STORE_URL.to_string(),
            rewrite: RewriteOptions::default(),
            write: WriteOptions::default(),
            accept_bare_archives: false,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the extension identifier.
    pub fn extension_id(mut self, id: impl Into<String>) -> Self {
        self.extension_id = id.into();
        self
    }

    /// Sets the default icon URL.
    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = url.into();
        self
    }

    /// Sets the store detail page prefix.
    pub fn store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = url.into();
        self
    }

    /// Sets the rewrite options.
    pub fn rewrite(mut self, options: RewriteOptions) -> Self {
        self.rewrite = options;
        self
    }

    /// Sets the output archive options.
    pub fn write(mut self, options: WriteOptions) -> Self {
        self.write = options;
        self
    }

    /// Accepts bare archives in place of containers.
    pub fn accept_bare_archives(mut self, accept: bool) -> Self {
        self.accept_bare_archives = accept;
        self
    }
}

/// Per-run input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebrandRequest {
    /// Icon URL; the configured default applies when `None`.
    pub icon_url: Option<String>,
    /// Rules applied first to every text member.
    pub url_rules: Vec<ReplacementRule>,
    /// Rules applied after the URL rules.
    pub text_rules: Vec<ReplacementRule>,
    /// Explicit brand tokens; the first text rule applies when `None`.
    pub brand: Option<BrandTokens>,
}

impl RebrandRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the icon URL.
    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Appends a URL rule.
    pub fn url_rule(mut self, rule: ReplacementRule) -> Self {
        self.url_rules.push(rule);
        self
    }

    /// Appends a text rule.
    pub fn text_rule(mut self, rule: ReplacementRule) -> Self {
        self.text_rules.push(rule);
        self
    }

    /// Sets explicit brand tokens.
    pub fn brand(mut self, brand: BrandTokens) -> Self {
        self.brand = Some(brand);
        self
    }
}

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Not started.
    Idle,
    /// Downloading the container.
    Fetching,
    /// Locating and loading the embedded archive.
    Unwrapping,
    /// Applying the rebrand.
    Rewriting,
    /// Writing the output archive.
    Serializing,
    /// Finished successfully.
    Done,
    /// Stopped on an error.
    Failed,
}

impl Stage {
    /// Returns a human-readable name for this stage.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Unwrapping => "unwrapping",
            Stage::Rewriting => "rewriting",
            Stage::Serializing => "serializing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    /// Returns `true` for `Done` and `Failed`.
    pub fn is_final(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sizes observed during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Size of the downloaded container.
    pub container_size: usize,
    /// Size of the embedded archive.
    pub archive_size: usize,
    /// Size of the rewritten archive. `None` when nothing was rewritten.
    pub final_size: Option<usize>,
}

/// Successful result of a run.
#[must_use = "pipeline outcome should be checked to see whether anything was modified"]
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// At least one member changed.
    Modified {
        /// The rewritten archive.
        archive: Vec<u8>,
        /// Run statistics.
        stats: PipelineStats,
        /// Every change made.
        ledger: ModificationLedger,
    },
    /// Nothing changed; no archive was produced.
    Unmodified {
        /// Run statistics.
        stats: PipelineStats,
    },
}

impl PipelineOutcome {
    /// Returns the run statistics.
    pub fn stats(&self) -> &PipelineStats {
        match self {
            PipelineOutcome::Modified { stats, .. } | PipelineOutcome::Unmodified { stats } => stats,
        }
    }

    /// Returns the ledger of a modified run.
    pub fn ledger(&self) -> Option<&ModificationLedger> {
        match self {
            PipelineOutcome::Modified { ledger, .. } => Some(ledger),
            PipelineOutcome::Unmodified { .. } => None,
        }
    }

    /// Returns the rewritten archive of a modified run.
    pub fn archive(&self) -> Option<&[u8]> {
        match self {
            PipelineOutcome::Modified { archive, .. } => Some(archive),
            PipelineOutcome::Unmodified { .. } => None,
        }
    }

    /// Returns `true` if the run changed anything.
    pub fn is_modified(&self) -> bool {
        matches!(self, PipelineOutcome::Modified { .. })
    }
}

/// Stage tracker for one run.
struct Run<'a> {
    stage: Stage,
    observer: &'a mut dyn FnMut(Stage),
}

impl Run<'_> {
    fn enter(&mut self, next: Stage) {
        log::debug!("Pipeline stage {} -> {}", self.stage, next);
        self.stage = next;
        (self.observer)(next);
    }
}

/// Fetch, unwrap, rewrite and serialize an extension package.
///
/// A pipeline holds only immutable configuration and its fetcher, so one
/// instance can serve many runs.
#[derive(Debug)]
pub struct Pipeline<F: Fetcher> {
    fetcher: F,
    config: PipelineConfig,
}

impl<F: Fetcher> Pipeline<F> {
    /// Creates a pipeline.
    pub fn new(fetcher: F, config: PipelineConfig) -> Self {
        Self { fetcher, config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs the pipeline for the configured extension.
    pub fn run(&self, request: &RebrandRequest) -> Result<PipelineOutcome> {
        self.run_observed(request, |_| {})
    }

    /// Runs the pipeline and reports every stage entered to `on_stage`.
    pub fn run_observed(&self, request: &RebrandRequest, mut on_stage: impl FnMut(Stage)) -> Result<PipelineOutcome> {
        self.execute(None, request, &mut on_stage)
    }

    /// Reads the store listing of the configured extension from the
    /// configured store page prefix.
    pub fn check_listing(&self) -> Result<ExtensionListing> {
        store::check_listing(&self.fetcher, &self.config.store_url, &self.config.extension_id)
    }

    /// Runs the pipeline over container bytes already in hand.
    ///
    /// The container is not downloaded; icons still go through the fetcher.
    pub fn run_with_container(&self, container: Vec<u8>, request: &RebrandRequest) -> Result<PipelineOutcome> {
        self.execute(Some(container), request, &mut |_: Stage| {})
    }

    fn execute(
        &self,
        container: Option<Vec<u8>>,
        request: &RebrandRequest,
        observer: &mut dyn FnMut(Stage),
    ) -> Result<PipelineOutcome> {
        let mut run = Run {
            stage: Stage::Idle,
            observer,
        };

        match self.drive(&mut run, container, request) {
            Ok(outcome) => {
                run.enter(Stage::Done);
                Ok(outcome)
            }
            Err(e) => {
                log::warn!("Pipeline failed while {}: {}", run.stage, e);
                run.enter(Stage::Failed);
                Err(e)
            }
        }
    }

    fn drive(&self, run: &mut Run<'_>, container: Option<Vec<u8>>, request: &RebrandRequest) -> Result<PipelineOutcome> {
        let rewriter = self.rewriter(request)?;

        run.enter(Stage::Fetching);
        let container = match container {
            Some(container) => container,
            None => self.fetcher.fetch_container(&self.config.extension_id)?,
        };

        run.enter(Stage::Unwrapping);
        log::debug!(
            "Container is {} ({} bytes)",
            detect_format(&container),
            container.len()
        );
        let archive = if self.config.accept_bare_archives && is_bare_archive(&container) {
            log::info!("Container is a bare archive, skipping unwrap");
            container.as_slice()
        } else {
            unwrap_container(&container)?
        };
        let mut image = ArchiveImage::from_zip_bytes(archive)?;
        let mut stats = PipelineStats {
            container_size: container.len(),
            archive_size: archive.len(),
            final_size: None,
        };

        run.enter(Stage::Rewriting);
        let icon = if rewriter.needs_icon(&image) {
            let url = request.icon_url.as_deref().unwrap_or(&self.config.icon_url);
            Some(self.fetcher.fetch_image(url)?)
        } else {
            None
        };
        let ledger = rewriter.rewrite(&mut image, icon.as_deref());

        if ledger.is_empty() {
            log::info!("No modifications made");
            return Ok(PipelineOutcome::Unmodified { stats });
        }

        run.enter(Stage::Serializing);
        let archive = image.to_zip_bytes(&self.config.write)?;
        stats.final_size = Some(archive.len());
        log::info!(
            "Rebranded archive: {} -> {} bytes, {} members modified",
            stats.archive_size,
            archive.len(),
            ledger.len()
        );

        Ok(PipelineOutcome::Modified {
            archive,
            stats,
            ledger,
        })
    }

    fn rewriter(&self, request: &RebrandRequest) -> Result<Rewriter> {
        let url_rules = RuleSet::compile(&request.url_rules)?;
        let text_rules = RuleSet::compile(&request.text_rules)?;
        let rewriter = Rewriter::new(url_rules, text_rules).with_options(self.config.rewrite.clone());
        Ok(match &request.brand {
            Some(brand) => rewriter.with_brand(brand.clone()),
            None => rewriter,
        })
    }
}
