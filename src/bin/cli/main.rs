//! CLI tool for rebranding extension packages.

mod commands;
mod exit_codes;
mod output;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::LevelFilter;
use std::path::PathBuf;

use relabel::ReplacementRule;
use relabel::pipeline::DEFAULT_EXTENSION_ID;
use relabel::store::DEFAULT_STORE_URL;

use exit_codes::ExitCode;

/// Rebrand packaged browser extensions
#[derive(Parser)]
#[command(name = "relabel")]
#[command(author, version, about = "Rebrand packaged browser extensions", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an extension and write a rebranded archive
    Rebrand {
        /// Extension identifier
        #[arg(long, env = "RELABEL_EXTENSION_ID", default_value = DEFAULT_EXTENSION_ID)]
        id: String,

        /// Output archive (default: <ID>_modified.zip)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Read the container from a file instead of downloading it
        #[arg(long)]
        container: Option<PathBuf>,

        /// Request document (JSON) with iconUrl, urlReplacements, textReplacements and brand
        #[arg(long)]
        request: Option<PathBuf>,

        /// URL rule, applied before text rules (repeatable)
        #[arg(long = "url-rule", value_name = "OLD=NEW")]
        url_rules: Vec<ReplacementRule>,

        /// Text rule (repeatable). The first one names the brand unless --brand is given
        #[arg(long = "text-rule", value_name = "OLD=NEW")]
        text_rules: Vec<ReplacementRule>,

        /// Brand tokens for the product name and stylesheet rename
        #[arg(long, value_name = "OLD=NEW")]
        brand: Option<ReplacementRule>,

        /// Icon to install
        #[arg(long, env = "RELABEL_ICON_URL")]
        icon_url: Option<String>,

        /// Path of the icon member inside the archive
        #[arg(long)]
        icon_path: Option<String>,

        /// Accept a bare ZIP archive as the container
        #[arg(long)]
        accept_bare: bool,

        /// Compression for the output archive
        #[arg(short = 'm', long, value_enum, default_value = "deflate")]
        method: CompressionMethod,

        /// Compression level (0-9)
        #[arg(short = 'l', long)]
        level: Option<u32>,

        /// Enable deterministic output
        #[arg(long)]
        deterministic: bool,

        /// HTTP timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },

    /// Strip the envelope from a container file
    Unwrap {
        /// Container file
        container: PathBuf,

        /// Output archive
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Show container format and archive contents
    #[command(alias = "i")]
    Inspect {
        /// Container or archive file
        container: PathBuf,
    },

    /// Show the published name and version of an extension
    Check {
        /// Extension identifier
        #[arg(long, env = "RELABEL_EXTENSION_ID", default_value = DEFAULT_EXTENSION_ID)]
        id: String,

        /// Store detail page prefix
        #[arg(long, default_value = DEFAULT_STORE_URL)]
        store_url: String,

        /// HTTP timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CompressionMethod {
    Store,
    Deflate,
}

impl From<CompressionMethod> for relabel::Compression {
    fn from(method: CompressionMethod) -> Self {
        match method {
            CompressionMethod::Store => relabel::Compression::Stored,
            CompressionMethod::Deflate => relabel::Compression::Deflated,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let log_level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, _) => LevelFilter::Debug,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );
    if log_level <= LevelFilter::Info {
        builder.format_timestamp(None).format_target(false);
    }
    builder.filter_module("rustls", LevelFilter::Error);
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        Commands::Rebrand {
            id,
            output,
            container,
            request,
            url_rules,
            text_rules,
            brand,
            icon_url,
            icon_path,
            accept_bare,
            method,
            level,
            deterministic,
            timeout,
        } => commands::rebrand(&commands::RebrandConfig {
            extension_id: &id,
            output,
            container: container.as_deref(),
            request: request.as_deref(),
            url_rules,
            text_rules,
            brand,
            icon_url,
            icon_path,
            accept_bare,
            method,
            level,
            deterministic,
            timeout,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Unwrap { container, output } => {
            commands::unwrap(&container, &output, cli.format, cli.quiet)
        }

        Commands::Inspect { container } => commands::inspect(&container, cli.format),

        Commands::Check {
            id,
            store_url,
            timeout,
        } => commands::check(&id, &store_url, timeout, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
