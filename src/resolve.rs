//! Destination-name collision resolution.
//!
//! Policy:
//! - Try the plain generated name first.
//! - On collision, regenerate with `-0-`, `-1-`, ... inserted after the `-backup-` infix.
//! - Give up with `NameExhaustion` after `max_attempts` probes.
//!
//! Notes:
//! - The probe and the later create are not atomic. Another writer can take the name
//!   in between; creation then fails for that container and is not retried.

use chrono::NaiveDateTime;
use tracing::{debug, trace};

use crate::errors::BackupError;
use crate::naming::{disambiguator, generate_name, shorten, MAX_CONTAINER_NAME_LEN};

pub const DEFAULT_MAX_NAME_ATTEMPTS: u32 = 1000;

/// Limits applied while searching for a free name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamePolicy {
    pub max_len: usize,
    pub max_attempts: u32,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            max_len: MAX_CONTAINER_NAME_LEN,
            max_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
        }
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Final container name: disambiguated and truncated.
    pub container: String,
    /// Untruncated name without disambiguator. Log files are named after this.
    pub generated: String,
    /// Number of existence probes performed (>= 1).
    pub attempts: u32,
}

/// Find a destination name that `exists` reports as free.
///
/// `exists` is called once per candidate, in order. Any error it returns aborts
/// the search and is handed back unchanged.
pub fn resolve_destination_name<F>(
    source_name: &str,
    timestamp: &NaiveDateTime,
    policy: &NamePolicy,
    mut exists: F,
) -> Result<ResolvedName, BackupError>
where
    F: FnMut(&str) -> Result<bool, BackupError>,
{
    let generated = generate_name(source_name, timestamp, "");
    let mut candidate = shorten(&generated, policy.max_len);
    let mut attempts: u32 = 0;
    let mut count: u32 = 0;

    while attempts < policy.max_attempts {
        attempts += 1;
        if !exists(&candidate)? {
            debug!(source = source_name, container = %candidate, attempts, "destination name resolved");
            return Ok(ResolvedName {
                container: candidate,
                generated,
                attempts,
            });
        }
        if attempts == 3 {
            trace!(source = source_name, "resolve: multiple collisions, still searching");
        }
        candidate = shorten(
            &generate_name(source_name, timestamp, &disambiguator(count)),
            policy.max_len,
        );
        count += 1;
    }

    Err(BackupError::NameExhaustion {
        source_name: source_name.to_string(),
        attempts,
    })
}
