//! Core configuration types.
//! - Config holds the validated run settings.
//! - SourceContainer / DestinationAccount describe storage accounts.
//! - SecretString keeps account keys out of logs.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::resolve::DEFAULT_MAX_NAME_ATTEMPTS;

use super::COPY_TOOL_DEFAULT;

/// A string that never prints its contents.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value, for signing requests and handing to the copy tool.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One container to back up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContainer {
    pub storage_account: String,
    pub container_name: String,
    pub storage_key: SecretString,
}

impl SourceContainer {
    pub fn new(
        storage_account: impl Into<String>,
        container_name: impl Into<String>,
        storage_key: impl Into<SecretString>,
    ) -> Self {
        Self {
            storage_account: storage_account.into(),
            container_name: container_name.into(),
            storage_key: storage_key.into(),
        }
    }
}

/// The account that receives every backup container of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationAccount {
    pub storage_account: String,
    pub storage_key: SecretString,
}

impl DestinationAccount {
    pub fn new(storage_account: impl Into<String>, storage_key: impl Into<SecretString>) -> Self {
        Self {
            storage_account: storage_account.into(),
            storage_key: storage_key.into(),
        }
    }
}

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for one backup run.
#[derive(Debug, Clone)]
pub struct Config {
    pub destination: DestinationAccount,
    /// Where per-container copy transcripts go; relative paths resolve against `base_dir`
    pub relative_log_path: PathBuf,
    pub source_containers: Vec<SourceContainer>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional file for the tool's own log (not the copy transcripts)
    pub log_file: Option<PathBuf>,
    /// Program name or path of the copy tool
    pub copy_tool: PathBuf,
    /// Ceiling on destination-name probes per container
    pub max_name_attempts: u32,
    /// If true, resolve names but do not create containers or copy
    pub dry_run: bool,
    /// Directory holding the config file
    pub base_dir: PathBuf,
}

impl Config {
    /// Construct a Config with the required fields; other fields use defaults.
    pub fn new(
        destination: DestinationAccount,
        relative_log_path: impl Into<PathBuf>,
        source_containers: Vec<SourceContainer>,
    ) -> Self {
        Self {
            destination,
            relative_log_path: relative_log_path.into(),
            source_containers,
            log_level: LogLevel::Normal,
            log_file: None,
            copy_tool: PathBuf::from(COPY_TOOL_DEFAULT),
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            dry_run: false,
            base_dir: PathBuf::from("."),
        }
    }

    /// Absolute (or base-relative) directory for copy transcripts.
    pub fn log_dir(&self) -> PathBuf {
        resolve_against(&self.base_dir, &self.relative_log_path)
    }
}

pub(crate) fn resolve_against(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
