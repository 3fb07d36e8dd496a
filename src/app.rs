//! Application orchestrator.
//! Loads config, initializes logging, installs the interrupt handler, checks
//! prerequisites, takes the run lock and drives the backup of every container.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use blob_backup::backup::prepare_log_dir;
use blob_backup::cli::Args;
use blob_backup::config::{load_or_init, locate_config, LoadResult};
use blob_backup::lock::acquire_run_lock;
use blob_backup::output as out;
use blob_backup::platform::config_permission_warnings;
use blob_backup::{AzCopy, AzureBlobStore, BackupOrchestrator, BackupState, CopyTool, RunContext, RunSummary};

use crate::logging::init_tracing;

/// The terminal delivers Ctrl-C to azcopy as well, so the running copy usually fails too.
const INTERRUPT_NOTICE: &str = "Received interrupt; the running copy was signalled too and will likely be recorded as failed. \
Remaining containers will be skipped. Press Ctrl-C again to exit immediately.";

fn print_config_location(args: &Args) -> Result<()> {
    let loc = locate_config(args.config.as_deref())?;
    if loc.explicit {
        out::print_info(&format!("Using explicit config file:\n  {}\n", loc.path.display()));
    } else {
        out::print_info(&format!("Default blob_backup config path:\n  {}\n", loc.path.display()));
    }
    if loc.path.exists() {
        out::print_info("A config file exists at that location.");
    } else if loc.explicit {
        out::print_warn("No file exists at that location.");
    } else {
        out::print_info("No config file exists there yet. Run without --print-config to create a template.");
    }
    Ok(())
}

fn report(summary: &RunSummary) {
    for run in &summary.runs {
        let dest = run.container().unwrap_or("-");
        let line = format!("{} -> {}", run.source.container_name, dest);
        match (&run.state, &run.error) {
            (BackupState::DryRun, _) => out::print_user(&format!("{line} (dry-run)")),
            (_, None) => out::print_success(&line),
            (_, Some(e)) => out::print_error(&format!("{line}: {e}")),
        }
    }
}

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        return print_config_location(&args);
    }

    let (mut cfg, cfg_path) = match load_or_init(args.config.as_deref())? {
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!("A template blob_backup config was written to: {}", path.display()));
            out::print_info("Edit it to set the destination account, the log path and the source containers, then re-run.");
            out::print_info("To use a different location pass --config or set BLOB_BACKUP_CONFIG.");
            return Ok(());
        }
        LoadResult::Loaded { config, path } => (*config, path),
    };
    args.apply_overrides(&mut cfg);

    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    // Guard is dropped on interrupt so buffered file logs are flushed.
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let guard_slot = Arc::clone(&guard_slot);
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            if cancel.swap(true, Ordering::SeqCst) {
                // Second interrupt: stop waiting for the running copy.
                if let Ok(mut g) = guard_slot.lock() {
                    let _ = g.take();
                }
                std::process::exit(130);
            }
            out::print_warn(INTERRUPT_NOTICE);
        })
        .context("installing interrupt handler")?;
    }

    info!(
        config = %cfg_path.display(),
        destination = %cfg.destination.storage_account,
        sources = cfg.source_containers.len(),
        log_dir = %cfg.log_dir().display(),
        "Config loaded"
    );

    match config_permission_warnings(&cfg_path) {
        Ok(warnings) => {
            for w in warnings {
                warn!(path = %cfg_path.display(), "{w}");
            }
        }
        Err(e) => debug!(path = %cfg_path.display(), error = %e, "could not inspect config permissions"),
    }

    debug!("Starting blob_backup: {:?}", args);

    let result = (|| -> Result<()> {
        let timestamp = Local::now().naive_local();

        let tool = AzCopy::new(cfg.copy_tool.clone());
        let program = tool.ensure_available().inspect_err(|e| {
            error!(code = e.code(), kind = e.kind(), "{e}");
        })?;
        debug!(program = %program.display(), "copy tool found");

        let store = AzureBlobStore::new(&cfg.destination)?;
        let ctx = RunContext::new(cfg, timestamp);

        // A dry run only reads; it neither creates the log directory nor takes the lock.
        let _lock = if ctx.dry_run {
            None
        } else {
            prepare_log_dir(&ctx.log_dir)?;
            let lock = acquire_run_lock(&ctx.log_dir).inspect_err(|e| {
                error!(code = e.code(), kind = e.kind(), "{e}");
            })?;
            debug!(lock = %lock.path().display(), "run lock acquired");
            Some(lock)
        };

        info!(
            containers = ctx.config.source_containers.len(),
            destination = %ctx.config.destination.storage_account,
            log_dir = %ctx.log_dir.display(),
            dry_run = ctx.dry_run,
            "Starting backup run"
        );
        let summary = BackupOrchestrator::new(&ctx, &store, &tool)
            .with_cancel(Arc::clone(&cancel))
            .run();
        report(&summary);

        if summary.failed() > 0 {
            bail!(
                "{} of {} container backups failed",
                summary.failed(),
                summary.runs.len()
            );
        }
        Ok(())
    })();

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}
