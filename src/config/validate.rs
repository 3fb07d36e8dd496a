//! Config validation logic.
//! Every required field must be present and non-empty before any backup starts;
//! the destination key must decode as base64 because requests are signed with it.
//! Runs before logging is initialized, so failures are reported only through the returned error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crate::errors::BackupError;

use super::types::Config;

impl Config {
    /// Check required fields. Any failure is a run-level `Configuration` error.
    pub fn validate(&self) -> Result<(), BackupError> {
        require(&self.destination.storage_account, "destination_storage_account.storage_account")?;
        if self.destination.storage_key.is_empty() {
            return fail("destination_storage_account.storage_key is missing or empty".into());
        }
        if BASE64.decode(self.destination.storage_key.expose()).is_err() {
            return fail("destination_storage_account.storage_key is not valid base64".into());
        }

        if self.relative_log_path.as_os_str().is_empty() {
            return fail("relative_log_path is missing or empty".into());
        }

        if self.source_containers.is_empty() {
            return fail("source_containers must list at least one source_container".into());
        }
        for (i, src) in self.source_containers.iter().enumerate() {
            require(&src.storage_account, &format!("source_containers[{i}].storage_account"))?;
            require(&src.container_name, &format!("source_containers[{i}].container_name"))?;
            if src.storage_key.is_empty() {
                return fail(format!("source_containers[{i}].storage_key is missing or empty"));
            }
        }

        if self.max_name_attempts == 0 {
            return fail("max_name_attempts must be at least 1".into());
        }

        Ok(())
    }
}

fn require(value: &str, name: &str) -> Result<(), BackupError> {
    if value.is_empty() {
        return fail(format!("{name} is missing or empty"));
    }
    Ok(())
}

fn fail(msg: String) -> Result<(), BackupError> {
    Err(BackupError::Configuration(msg))
}
