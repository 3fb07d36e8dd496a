//! Typed error definitions for blob_backup.
//! Run-level failures (config, prerequisites, lock) abort the whole invocation;
//! the rest are scoped to a single source container.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Required copy tool not found: {tool}")]
    PrerequisiteMissing { tool: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Another backup run holds the lock at {path}")]
    RunLocked { path: PathBuf },

    #[error("No free destination name for '{source_name}' after {attempts} attempts")]
    NameExhaustion { source_name: String, attempts: u32 },

    #[error("Destination store error while {context}: {reason}")]
    Store { context: String, reason: String },

    #[error("Failed to create destination container '{container}': {reason}")]
    ContainerCreation { container: String, reason: String },

    #[error("Failed to launch copy tool '{tool}': {reason}")]
    CopyToolLaunch { tool: String, reason: String },

    #[error("Copy into '{destination}' failed (exit code {})", display_code(.code))]
    CopyToolFailed { destination: String, code: Option<i32> },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Backup interrupted by shutdown request")]
    Interrupted,
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none, terminated by signal".into())
}

impl BackupError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u32 {
        match self {
            BackupError::PrerequisiteMissing { .. } => 10,
            BackupError::Configuration(_) => 11,
            BackupError::RunLocked { .. } => 12,
            BackupError::NameExhaustion { .. } => 20,
            BackupError::Store { .. } => 21,
            BackupError::ContainerCreation { .. } => 22,
            BackupError::CopyToolLaunch { .. } => 30,
            BackupError::CopyToolFailed { .. } => 31,
            BackupError::Io { .. } => 40,
            BackupError::Interrupted => 50,
        }
    }

    /// Short machine-friendly label, used as the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            BackupError::PrerequisiteMissing { .. } => "prerequisite_missing",
            BackupError::Configuration(_) => "configuration",
            BackupError::RunLocked { .. } => "run_locked",
            BackupError::NameExhaustion { .. } => "name_exhaustion",
            BackupError::Store { .. } => "store",
            BackupError::ContainerCreation { .. } => "container_creation",
            BackupError::CopyToolLaunch { .. } => "copy_tool_launch",
            BackupError::CopyToolFailed { .. } => "copy_tool_failed",
            BackupError::Io { .. } => "io",
            BackupError::Interrupted => "interrupted",
        }
    }

    /// True when the error must abort the entire run rather than one container.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackupError::PrerequisiteMissing { .. }
                | BackupError::Configuration(_)
                | BackupError::RunLocked { .. }
        )
    }

    /// Helper for `map_err` on io results.
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> BackupError {
        let context = context.into();
        move |source| BackupError::Io { context, source }
    }
}
