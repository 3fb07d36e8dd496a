//! External bulk-copy tool.
//!
//! The data transfer itself is delegated to `azcopy`. We only build its argument
//! list, point both output streams at the per-container transcript, wait for it
//! to exit, and turn the exit status into a result.
//!
//! Notes:
//! - There is no timeout: a hung copy blocks the run.
//! - The legacy azcopy flag set is used (`--source`, `--dest-key`, ...).

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info, warn};

use crate::config::SecretString;
use crate::errors::BackupError;

/// Everything the copy tool is told about one backup.
#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub source_url: String,
    pub source_key: SecretString,
    pub destination_url: String,
    pub destination_key: SecretString,
}

/// How a copy ended when the tool could be launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub exit_code: Option<i32>,
}

/// Seam for the delegated copy so orchestration can be tested without azcopy.
pub trait CopyTool {
    /// Resolve the program, failing with `PrerequisiteMissing` when absent.
    fn ensure_available(&self) -> Result<PathBuf, BackupError>;

    /// Run one copy with stdout and stderr both written to `transcript`.
    /// Returns `Ok` only when the tool exits successfully.
    fn copy(&self, request: &CopyRequest, transcript: File) -> Result<CopyOutcome, BackupError>;
}

impl<T: CopyTool + ?Sized> CopyTool for &T {
    fn ensure_available(&self) -> Result<PathBuf, BackupError> {
        (**self).ensure_available()
    }

    fn copy(&self, request: &CopyRequest, transcript: File) -> Result<CopyOutcome, BackupError> {
        (**self).copy(request, transcript)
    }
}

/// `azcopy` invoked as a child process.
#[derive(Debug, Clone)]
pub struct AzCopy {
    program: PathBuf,
}

impl AzCopy {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Fixed argument shape: source, source key, destination, destination key,
    /// recursive, non-interactive, verbose.
    pub fn args(request: &CopyRequest) -> Vec<OsString> {
        [
            "--source",
            request.source_url.as_str(),
            "--source-key",
            request.source_key.expose(),
            "--destination",
            request.destination_url.as_str(),
            "--dest-key",
            request.destination_key.expose(),
            "--recursive",
            "--quiet",
            "--verbose",
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }
}

impl Default for AzCopy {
    fn default() -> Self {
        Self::new(crate::config::COPY_TOOL_DEFAULT)
    }
}

/// Append a diagnostic line after the tool's own output.
fn write_trailer(log: &mut File, line: &str) {
    if let Err(e) = writeln!(log, "{line}") {
        warn!(error = %e, trailer = line, "could not write copy log trailer");
    }
}

impl CopyTool for AzCopy {
    fn ensure_available(&self) -> Result<PathBuf, BackupError> {
        which::which(&self.program).map_err(|e| {
            warn!(tool = %self.program.display(), error = %e, "copy tool lookup failed");
            BackupError::PrerequisiteMissing {
                tool: self.program.display().to_string(),
            }
        })
    }

    fn copy(&self, request: &CopyRequest, transcript: File) -> Result<CopyOutcome, BackupError> {
        let tool = self.program.display().to_string();
        let mut log = transcript;
        let stdout = log.try_clone().map_err(BackupError::io("duplicating transcript handle"))?;
        let stderr = log.try_clone().map_err(BackupError::io("duplicating transcript handle"))?;

        debug!(tool = %tool, source = %request.source_url, destination = %request.destination_url, "spawning copy tool");
        let status = Command::new(&self.program)
            .args(Self::args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status();

        let status: ExitStatus = match status {
            Ok(s) => s,
            Err(e) => {
                write_trailer(&mut log, &format!("blob_backup: failed to launch '{tool}': {e}"));
                return Err(BackupError::CopyToolLaunch {
                    tool,
                    reason: e.to_string(),
                });
            }
        };

        let outcome = CopyOutcome {
            exit_code: status.code(),
        };
        if status.success() {
            info!(destination = %request.destination_url, "Copy completed");
            return Ok(outcome);
        }
        write_trailer(&mut log, &format!("blob_backup: '{tool}' exited with {status}"));
        Err(BackupError::CopyToolFailed {
            destination: request.destination_url.clone(),
            code: outcome.exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CopyRequest {
        CopyRequest {
            source_url: "https://srcacct.blob.core.windows.net/mydata".into(),
            source_key: SecretString::new("k1"),
            destination_url: "https://dstacct.blob.core.windows.net/20240315-0930-backup-mydata".into(),
            destination_key: SecretString::new("k2"),
        }
    }

    #[test]
    fn argument_shape_is_fixed() {
        let args: Vec<String> = AzCopy::args(&request())
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            vec![
                "--source",
                "https://srcacct.blob.core.windows.net/mydata",
                "--source-key",
                "k1",
                "--destination",
                "https://dstacct.blob.core.windows.net/20240315-0930-backup-mydata",
                "--dest-key",
                "k2",
                "--recursive",
                "--quiet",
                "--verbose",
            ]
        );
    }

    #[test]
    fn missing_program_is_prerequisite_error() {
        let tool = AzCopy::new("blob-backup-no-such-copy-tool-xyz");
        let err = tool.ensure_available().unwrap_err();
        assert!(matches!(err, BackupError::PrerequisiteMissing { .. }));
    }

    #[derive(Clone)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unwritable_transcript_trailer_is_logged() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("ro-log.txt");
        File::create(&path).unwrap();
        let read_only = File::open(&path).unwrap();
        let tool = AzCopy::new(td.path().join("does-not-exist"));

        let buf = Captured(Default::default());
        let sink = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        let err = tracing::subscriber::with_default(subscriber, || {
            tool.copy(&request(), read_only).unwrap_err()
        });

        assert!(matches!(err, BackupError::CopyToolLaunch { .. }));
        let logged = String::from_utf8_lossy(&buf.0.lock().unwrap()).to_string();
        assert!(logged.contains("could not write copy log trailer"), "logged: {logged}");
    }

    #[test]
    fn launch_failure_is_written_to_transcript() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("t-log.txt");
        let file = File::create(&path).unwrap();
        let tool = AzCopy::new(td.path().join("does-not-exist"));
        let err = tool.copy(&request(), file).unwrap_err();
        assert!(matches!(err, BackupError::CopyToolLaunch { .. }));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("failed to launch"), "transcript: {text}");
    }
}
