//! Output formatting for CLI operations.

use console::style;
use serde_json::json;
use std::path::Path;

use relabel::{ArchiveImage, ContainerInfo, ExtensionListing, ModificationLedger, PipelineStats};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the result of a rebrand that modified the archive
    fn format_rebrand(&self, output: &Path, stats: &PipelineStats, ledger: &ModificationLedger) -> String;

    /// Formats the result of a rebrand that changed nothing
    fn format_unmodified(&self, stats: &PipelineStats) -> String;

    /// Formats container information and the archive listing
    fn format_inspect(&self, info: &ContainerInfo, image: Option<&ArchiveImage>) -> String;

    /// Formats the result of an unwrap
    fn format_unwrap(&self, output: &Path, container_size: usize, archive_size: usize) -> String;

    /// Formats a store listing
    fn format_listing(&self, listing: &ExtensionListing) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_rebrand(&self, output: &Path, stats: &PipelineStats, ledger: &ModificationLedger) -> String {
        let mut out = String::new();

        for record in ledger {
            out.push_str(&format!("{}\n", style(record.path.as_str()).bold()));
            for change in &record.changes {
                out.push_str(&format!("  {}\n", change));
            }
        }
        out.push_str(&"-".repeat(60));
        out.push('\n');
        out.push_str(&format!(
            "{} {} members modified, {} changes\n",
            style("Rebranded:").green(),
            ledger.len(),
            ledger.change_count()
        ));
        out.push_str(&format!(
            "  Container: {}\n  Archive:   {}\n  Output:    {}\n",
            humanize_bytes(stats.container_size as u64),
            humanize_bytes(stats.archive_size as u64),
            humanize_bytes(stats.final_size.unwrap_or_default() as u64)
        ));
        out.push_str(&format!("Wrote {}\n", output.display()));

        out
    }

    fn format_unmodified(&self, stats: &PipelineStats) -> String {
        format!(
            "{} no modifications made (container {}, archive {})\n",
            style("Warning:").yellow(),
            humanize_bytes(stats.container_size as u64),
            humanize_bytes(stats.archive_size as u64)
        )
    }

    fn format_inspect(&self, info: &ContainerInfo, image: Option<&ArchiveImage>) -> String {
        let mut out = String::new();

        out.push_str("Container Information:\n");
        out.push_str(&"-".repeat(40));
        out.push('\n');
        out.push_str(&format!("  Format:          {}\n", info.format));
        out.push_str(&format!("  Size:            {}\n", humanize_bytes(info.size as u64)));
        out.push_str(&format!("  Header offset:   {}\n", offset_str(info.declared_offset)));
        out.push_str(&format!("  Archive offset:  {}\n", offset_str(info.archive_offset)));
        if info.offsets_disagree() {
            out.push_str(&format!(
                "  {} header and scanned offsets disagree\n",
                style("Note:").yellow()
            ));
        }

        if let Some(image) = image {
            out.push('\n');
            out.push_str(&format!("{:>12} {}\n", "Size", "Name"));
            out.push_str(&"-".repeat(60));
            out.push('\n');
            for member in image {
                if member.is_directory {
                    out.push_str(&format!("{:>12} {}/\n", "", member.path));
                } else {
                    out.push_str(&format!(
                        "{:>12} {}\n",
                        humanize_bytes(member.data.len() as u64),
                        member.path
                    ));
                }
            }
            out.push_str(&"-".repeat(60));
            out.push('\n');
            out.push_str(&format!(
                "{} members, {} total\n",
                image.len(),
                humanize_bytes(image.content_size())
            ));
        }

        out
    }

    fn format_unwrap(&self, output: &Path, container_size: usize, archive_size: usize) -> String {
        format!(
            "Unwrapped {} -> {} into {}\n",
            humanize_bytes(container_size as u64),
            humanize_bytes(archive_size as u64),
            output.display()
        )
    }

    fn format_listing(&self, listing: &ExtensionListing) -> String {
        format!(
            "  Name:     {}\n  Version:  {}\n  ID:       {}\n  Store:    {}\n",
            listing.name, listing.version, listing.extension_id, listing.store_url
        )
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_rebrand(&self, output: &Path, stats: &PipelineStats, ledger: &ModificationLedger) -> String {
        let obj = json!({
            "success": true,
            "output": output.display().to_string(),
            "stats": stats_json(stats),
            "modifications": ledger,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_unmodified(&self, stats: &PipelineStats) -> String {
        let obj = json!({
            "warning": relabel::transport::UNMODIFIED_WARNING,
            "stats": stats_json(stats),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_inspect(&self, info: &ContainerInfo, image: Option<&ArchiveImage>) -> String {
        let members = image.map(|image| {
            image
                .iter()
                .map(|m| {
                    json!({
                        "path": m.path.as_str(),
                        "size": m.data.len(),
                        "is_directory": m.is_directory,
                    })
                })
                .collect::<Vec<_>>()
        });
        let obj = json!({
            "format": info.format.name(),
            "size": info.size,
            "declared_offset": info.declared_offset,
            "archive_offset": info.archive_offset,
            "members": members,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_unwrap(&self, output: &Path, container_size: usize, archive_size: usize) -> String {
        let obj = json!({
            "output": output.display().to_string(),
            "crxSize": container_size,
            "zipSize": archive_size,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_listing(&self, listing: &ExtensionListing) -> String {
        let obj = json!({
            "success": true,
            "data": listing,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

fn stats_json(stats: &PipelineStats) -> serde_json::Value {
    json!({
        "crxSize": stats.container_size,
        "zipSize": stats.archive_size,
        "modifiedSize": stats.final_size,
    })
}

fn offset_str(offset: Option<usize>) -> String {
    offset
        .map(|o| o.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
