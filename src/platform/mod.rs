//! Platform-specific helpers.
//! Hides Unix/Windows differences for the few places that care about file modes:
//! log files, copy transcripts, the config template and config permission checks.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    config_permission_warnings, open_log_file_secure_append, open_transcript_truncate,
    set_dir_mode_0700, write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    config_permission_warnings, open_log_file_secure_append, open_transcript_truncate,
    set_dir_mode_0700, write_config_secure_new_0600,
};
