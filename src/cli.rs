//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Flags override values loaded from the XML config.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};

/// Back up Azure blob containers into timestamped containers via azcopy.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Back up Azure blob containers into timestamp-named containers (Rust)"
)]
pub struct Args {
    /// Config file to use (overrides BLOB_BACKUP_CONFIG and the default location).
    #[arg(short = 'c', long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Copy program name or path (default: azcopy on PATH).
    #[arg(long, value_name = "PROGRAM", value_hint = ValueHint::CommandName)]
    pub copy_tool: Option<PathBuf>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Also write blob_backup's own log to this file.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        help = "Print the config file location blob_backup would use and exit"
    )]
    pub print_config: bool,

    /// Dry-run: resolve destination names but do not create containers or copy.
    #[arg(
        long,
        help = "Show which containers would be created, but do not create or copy anything"
    )]
    pub dry_run: bool,

    /// Per-container ceiling on destination name probes.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_name_attempts: Option<u32>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(tool) = &self.copy_tool {
            cfg.copy_tool = tool.clone();
        }
        if let Some(lf) = &self.log_file {
            cfg.log_file = Some(lf.clone());
        }
        if let Some(n) = self.max_name_attempts {
            cfg.max_name_attempts = n;
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
