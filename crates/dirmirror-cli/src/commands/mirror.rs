//! Mirror command - Make a target tree converge on a source tree
//!
//! Runs the `dirmirror <SOURCE_DIR> <TARGET_DIR>` invocation:
//! 1. Resolves the source root and checks it is a directory
//! 2. Creates the filesystem adapter with the configured copy buffer
//! 3. Runs the MirrorEngine (or only plans with `--dry-run`)
//! 4. Displays the run summary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use dirmirror_core::config::Config;
use dirmirror_sync::diff::DiffReporter;
use dirmirror_sync::engine::{MirrorEngine, MirrorResult};
use dirmirror_sync::filesystem::LocalFileSystemAdapter;
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Positional roots and mirror options
#[derive(Debug, Args)]
pub struct MirrorCommand {
    /// Directory to mirror from
    #[arg(value_name = "SOURCE_DIR")]
    pub source: PathBuf,

    /// Directory to mirror into (created if missing; its parent must exist)
    #[arg(value_name = "TARGET_DIR")]
    pub target: PathBuf,

    /// Show before/after metadata for every changed entry
    #[arg(long)]
    pub diff: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,
}

impl MirrorCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let source = std::fs::canonicalize(&self.source).with_context(|| {
            format!("Cannot resolve source directory {}", self.source.display())
        })?;
        if !source.is_dir() {
            bail!("Source is not a directory: {}", source.display());
        }

        let adapter = LocalFileSystemAdapter::new().with_buffer_size(config.copy_buffer_bytes());
        info!(
            attribute_store = adapter.attribute_store_name(),
            buffer_size = config.copy_buffer_bytes(),
            "Filesystem adapter ready"
        );

        let diff = DiffReporter::new(self.diff || config.report.diff);
        let engine = MirrorEngine::new(Arc::new(adapter), diff).with_dry_run(self.dry_run);

        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
        }

        let result = engine
            .run(&source, &self.target)
            .with_context(|| format!("Mirror into {} failed", self.target.display()))?;

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::to_value(&result)?;
            formatter.print_json(&json);
        } else {
            print_summary(formatter.as_ref(), &result);
        }

        Ok(())
    }
}

fn plural(count: u64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn format_duration(duration_ms: u64) -> String {
    if duration_ms >= 1000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{duration_ms}ms")
    }
}

fn print_summary(formatter: &dyn OutputFormatter, result: &MirrorResult) {
    let duration = format_duration(result.duration_ms);

    if result.is_unchanged() {
        formatter.success(&format!("Already up to date ({duration})"));
    } else if result.dry_run {
        formatter.success(&format!(
            "Dry run planned {} change{}",
            result.total_changes(),
            plural(result.total_changes())
        ));
    } else {
        formatter.success(&format!("Mirror completed in {duration}"));
    }

    let lines = [
        ("Directories created", result.directories_created),
        ("Files copied", result.files_copied),
        ("Files updated", result.files_updated),
        ("Times updated", result.mod_times_updated),
        ("Attributes updated", result.attributes_updated),
        ("Directory times", result.directory_times_restored),
    ];
    for (label, count) in lines {
        if count > 0 {
            formatter.info(&format!("{label:<20} {count}"));
        }
    }

    if result.bytes_copied > 0 {
        formatter.info(&format!(
            "{:<20} {} byte{}",
            "Copied",
            result.bytes_copied,
            plural(result.bytes_copied)
        ));
    }

    if result.entries_skipped > 0 {
        formatter.warn(&format!(
            "Skipped {} entr{} that are neither directories nor regular files",
            result.entries_skipped,
            if result.entries_skipped == 1 { "y" } else { "ies" }
        ));
    }
}
