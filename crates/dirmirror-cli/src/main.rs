//! dirmirror CLI - One-way directory mirror
//!
//! `dirmirror <SOURCE_DIR> <TARGET_DIR>` makes the target tree converge on
//! the source tree: missing entries are created, stale files are copied,
//! modification times and native attributes are carried over.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dirmirror_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::mirror::MirrorCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "dirmirror", version, about = "One-way directory mirror")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(flatten)]
    mirror: MirrorCommand,
}

impl Cli {
    /// Loads the configuration named by `--config`, or the default file
    /// if one exists
    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::load_or_default(&Config::default_path()),
        };

        let errors = config.validate();
        if !errors.is_empty() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("Invalid configuration: {}", details.join("; "));
        }

        Ok(config)
    }

    /// Log filter from the verbosity flags, falling back to the configured level
    fn log_filter<'a>(&self, config: &'a Config) -> &'a str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Setup tracing
    let filter = cli.log_filter(&config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs always go to stderr so stdout only carries the summary
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    cli.mirror.execute(&config, format)
}
