//! Backup orchestration.
//!
//! For each configured source container, in order:
//!   1. resolve a free destination name against the store
//!   2. create the destination container
//!   3. open `<log_dir>/<generated name>-log.txt`
//!   4. run the copy tool with both output streams going to that file
//!
//! Containers are independent: a failure is recorded on that container's
//! `BackupRun` and the loop moves on. Nothing is rolled back.
//!
//! The log file is named after the untruncated, undisambiguated name, so it can
//! differ from the container actually created when a collision was resolved.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use crate::config::{Config, SourceContainer};
use crate::copy_tool::{CopyRequest, CopyTool};
use crate::errors::BackupError;
use crate::platform::open_transcript_truncate;
use crate::resolve::{resolve_destination_name, NamePolicy, ResolvedName};
use crate::store::{blob_container_url, DestinationStore};

/// Immutable inputs of one invocation, built once at startup.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub log_dir: PathBuf,
    /// Captured once; every container in the run shares it.
    pub timestamp: NaiveDateTime,
    pub policy: NamePolicy,
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(config: Config, timestamp: NaiveDateTime) -> Self {
        let policy = NamePolicy {
            max_attempts: config.max_name_attempts,
            ..NamePolicy::default()
        };
        Self {
            log_dir: config.log_dir(),
            dry_run: config.dry_run,
            config,
            timestamp,
            policy,
        }
    }
}

/// Where a single container's backup got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    Pending,
    NameResolved,
    ContainerCreated,
    CopyInvoked,
    CopyCompleted,
    CopyFailed,
    /// Name resolved; nothing created or copied.
    DryRun,
    /// Not started because a shutdown was requested.
    Interrupted,
}

/// One source container's backup attempt.
#[derive(Debug)]
pub struct BackupRun {
    pub source: SourceContainer,
    pub destination: Option<ResolvedName>,
    pub log_path: Option<PathBuf>,
    pub state: BackupState,
    pub error: Option<BackupError>,
}

impl BackupRun {
    fn pending(source: &SourceContainer) -> Self {
        Self {
            source: source.clone(),
            destination: None,
            log_path: None,
            state: BackupState::Pending,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none() && matches!(self.state, BackupState::CopyCompleted | BackupState::DryRun)
    }

    /// Final destination container name, if one was resolved.
    pub fn container(&self) -> Option<&str> {
        self.destination.as_ref().map(|d| d.container.as_str())
    }
}

/// Ordered results of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub runs: Vec<BackupRun>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded()
    }
}

/// Make sure the transcript directory exists.
pub fn prepare_log_dir(dir: &Path) -> Result<PathBuf, BackupError> {
    fs::create_dir_all(dir)
        .map_err(BackupError::io(format!("creating log directory '{}'", dir.display())))?;
    Ok(dir.to_path_buf())
}

/// Log file for a backup: `<log_dir>/<generated>-log.txt`.
pub fn log_path_for(log_dir: &Path, resolved: &ResolvedName) -> PathBuf {
    log_dir.join(format!("{}-log.txt", resolved.generated))
}

pub struct BackupOrchestrator<'a, S, C> {
    ctx: &'a RunContext,
    store: S,
    tool: C,
    cancel: Arc<AtomicBool>,
}

impl<'a, S: DestinationStore, C: CopyTool> BackupOrchestrator<'a, S, C> {
    pub fn new(ctx: &'a RunContext, store: S, tool: C) -> Self {
        Self {
            ctx,
            store,
            tool,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a stop flag (set from a signal handler). Checked before each container.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Back up every configured source container, sequentially.
    pub fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for source in &self.ctx.config.source_containers {
            if self.cancel.load(Ordering::Relaxed) {
                let mut run = BackupRun::pending(source);
                run.state = BackupState::Interrupted;
                run.error = Some(BackupError::Interrupted);
                warn!(source = %source.container_name, "Skipping container: shutdown requested");
                summary.runs.push(run);
                continue;
            }
            summary.runs.push(self.backup_container(source));
        }
        info!(
            total = summary.runs.len(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Backup run finished"
        );
        summary
    }

    /// Back up one container. Errors are captured in the returned run, never propagated.
    pub fn backup_container(&self, source: &SourceContainer) -> BackupRun {
        let mut run = BackupRun::pending(source);
        if let Err(e) = self.drive(source, &mut run) {
            error!(
                code = e.code(),
                kind = e.kind(),
                source = %source.container_name,
                account = %source.storage_account,
                state = ?run.state,
                error = %e,
                "Backup failed"
            );
            run.error = Some(e);
        }
        run
    }

    fn drive(&self, source: &SourceContainer, run: &mut BackupRun) -> Result<(), BackupError> {
        let ctx = self.ctx;
        let resolved = resolve_destination_name(
            &source.container_name,
            &ctx.timestamp,
            &ctx.policy,
            |name| self.store.container_exists(name),
        )?;
        let container = resolved.container.clone();
        let log_path = log_path_for(&ctx.log_dir, &resolved);
        run.destination = Some(resolved);
        run.log_path = Some(log_path.clone());
        run.state = BackupState::NameResolved;

        let request = CopyRequest {
            source_url: blob_container_url(&source.storage_account, &source.container_name),
            source_key: source.storage_key.clone(),
            destination_url: self.store.container_url(&container),
            destination_key: ctx.config.destination.storage_key.clone(),
        };

        if ctx.dry_run {
            info!(
                source = %request.source_url,
                destination = %request.destination_url,
                log = %log_path.display(),
                "Dry-run: would create container and copy"
            );
            run.state = BackupState::DryRun;
            return Ok(());
        }

        self.store.create_container(&container)?;
        run.state = BackupState::ContainerCreated;

        let transcript = open_transcript_truncate(&log_path)
            .map_err(BackupError::io(format!("opening log file '{}'", log_path.display())))?;

        run.state = BackupState::CopyInvoked;
        info!(source = %request.source_url, destination = %request.destination_url, log = %log_path.display(), "Starting copy");
        match self.tool.copy(&request, transcript) {
            Ok(_) => {
                run.state = BackupState::CopyCompleted;
                Ok(())
            }
            Err(e) => {
                run.state = BackupState::CopyFailed;
                Err(e)
            }
        }
    }
}
