//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relabel::container::{inspect as inspect_container, is_bare_archive, unwrap_container};
use relabel::transport::decode_request;
use relabel::{
    ArchiveImage, BrandTokens, Error, HttpFetcher, HttpFetcherOptions, Pipeline, PipelineConfig,
    PipelineOutcome, RebrandRequest, ReplacementRule, RewriteOptions, WriteOptions,
};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::{CompressionMethod, OutputFormat};

/// Configuration for the rebrand command.
pub struct RebrandConfig<'a> {
    pub extension_id: &'a str,
    pub output: Option<PathBuf>,
    pub container: Option<&'a Path>,
    pub request: Option<&'a Path>,
    pub url_rules: Vec<ReplacementRule>,
    pub text_rules: Vec<ReplacementRule>,
    pub brand: Option<ReplacementRule>,
    pub icon_url: Option<String>,
    pub icon_path: Option<String>,
    pub accept_bare: bool,
    pub method: CompressionMethod,
    pub level: Option<u32>,
    pub deterministic: bool,
    pub timeout: u64,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Rebrand command implementation
pub fn rebrand(config: &RebrandConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let request = match build_request(config) {
        Ok(r) => r,
        Err(e) => return report(&e),
    };

    let mut write = WriteOptions::new()
        .compression(config.method.into())
        .deterministic(config.deterministic);
    if let Some(level) = config.level {
        write = match write.level(level) {
            Ok(w) => w,
            Err(e) => return report(&e),
        };
    }

    let mut rewrite = RewriteOptions::new();
    if let Some(icon_path) = &config.icon_path {
        rewrite = rewrite.icon_path(icon_path.clone());
    }

    let pipeline_config = PipelineConfig::new()
        .extension_id(config.extension_id)
        .rewrite(rewrite)
        .write(write)
        .accept_bare_archives(config.accept_bare);

    let fetcher = match http_fetcher(config.timeout) {
        Ok(f) => f,
        Err(e) => return report(&e),
    };
    let pipeline = Pipeline::new(fetcher, pipeline_config);

    let result = match config.container {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => pipeline.run_with_container(bytes, &request),
            Err(e) => Err(Error::Io(e)),
        },
        None => pipeline.run(&request),
    };

    let outcome = match result {
        Ok(o) => o,
        Err(e) => return report(&e),
    };

    match outcome {
        PipelineOutcome::Modified {
            archive,
            stats,
            ledger,
        } => {
            let output = config
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}_modified.zip", config.extension_id)));
            if let Err(e) = std::fs::write(&output, &archive) {
                eprintln!("Error writing {}: {}", output.display(), e);
                return ExitCode::IoError;
            }
            if !config.quiet {
                print!("{}", formatter.format_rebrand(&output, &stats, &ledger));
            }
            ExitCode::Success
        }
        PipelineOutcome::Unmodified { stats } => {
            if !config.quiet {
                print!("{}", formatter.format_unmodified(&stats));
            }
            ExitCode::Warning
        }
    }
}

/// Merges the request document with the command line. Flags win.
fn build_request(config: &RebrandConfig<'_>) -> relabel::Result<RebrandRequest> {
    let mut request = match config.request {
        Some(path) => decode_request(&std::fs::read(path)?)?,
        None => RebrandRequest::new(),
    };

    request.url_rules.extend(config.url_rules.iter().cloned());
    request.text_rules.extend(config.text_rules.iter().cloned());
    if let Some(brand) = &config.brand {
        request.brand = Some(BrandTokens::new(brand.old.clone(), brand.new.clone()));
    }
    if let Some(icon_url) = &config.icon_url {
        request.icon_url = Some(icon_url.clone());
    }
    Ok(request)
}

/// Unwrap command implementation
pub fn unwrap(container_path: &Path, output: &Path, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);

    let container = match std::fs::read(container_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", container_path.display(), e);
            return ExitCode::IoError;
        }
    };

    let archive = match unwrap_container(&container) {
        Ok(a) => a,
        Err(e) => return report(&e),
    };

    if let Err(e) = std::fs::write(output, archive) {
        eprintln!("Error writing {}: {}", output.display(), e);
        return ExitCode::IoError;
    }

    if !quiet {
        print!("{}", formatter.format_unwrap(output, container.len(), archive.len()));
    }
    ExitCode::Success
}

/// Inspect command implementation
pub fn inspect(container_path: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let container = match std::fs::read(container_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", container_path.display(), e);
            return ExitCode::IoError;
        }
    };

    let info = inspect_container(&container);
    let archive = if is_bare_archive(&container) {
        Some(container.as_slice())
    } else {
        unwrap_container(&container).ok()
    };

    let image = match archive.map(ArchiveImage::from_zip_bytes).transpose() {
        Ok(image) => image,
        Err(e) => {
            print!("{}", formatter.format_inspect(&info, None));
            return report(&e);
        }
    };

    print!("{}", formatter.format_inspect(&info, image.as_ref()));

    if image.is_some() {
        ExitCode::Success
    } else {
        ExitCode::BadContainer
    }
}

/// Check command implementation
pub fn check(extension_id: &str, store_url: &str, timeout: u64, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let fetcher = match http_fetcher(timeout) {
        Ok(f) => f,
        Err(e) => return report(&e),
    };

    let config = PipelineConfig::new()
        .extension_id(extension_id)
        .store_url(store_url);
    match Pipeline::new(fetcher, config).check_listing() {
        Ok(listing) => {
            print!("{}", formatter.format_listing(&listing));
            ExitCode::Success
        }
        Err(e) => report(&e),
    }
}

fn http_fetcher(timeout: u64) -> relabel::Result<HttpFetcher> {
    HttpFetcher::with_options(HttpFetcherOptions::new().timeout(Duration::from_secs(timeout)))
}

/// Prints an error and returns its exit code
fn report(error: &Error) -> ExitCode {
    eprintln!("Error: {}", error);
    error_to_exit_code(error)
}
