//! Destination container naming.
//!
//! Names have the shape `<YYYYMMDD-HHMM>-backup-<disambiguator><source>` and are
//! cut to at most [`MAX_CONTAINER_NAME_LEN`] characters. The timestamp comes first
//! so backups sort lexicographically by creation time, and the 13-character prefix
//! always survives truncation.
//!
//! Truncation is blind: a long source name can lose its tail, and the
//! disambiguator can be cut off entirely. Collision handling lives in `resolve`.

use chrono::NaiveDateTime;

/// Azure's upper bound on container name length.
pub const MAX_CONTAINER_NAME_LEN: usize = 63;

/// strftime pattern of the leading timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M";

pub const BACKUP_INFIX: &str = "-backup-";

/// Build the untruncated backup name. `source_name` is not validated or escaped.
pub fn generate_name(source_name: &str, timestamp: &NaiveDateTime, disambiguator: &str) -> String {
    let mut name = timestamp.format(TIMESTAMP_FORMAT).to_string();
    name.push_str(BACKUP_INFIX);
    name.push_str(disambiguator);
    name.push_str(source_name);
    name
}

/// First `max_len` characters of `name`.
pub fn shorten(name: &str, max_len: usize) -> String {
    match name.char_indices().nth(max_len) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name.to_string(),
    }
}

/// Disambiguator inserted on the `count`-th retry: `-0-`, `-1-`, ...
pub fn disambiguator(count: u32) -> String {
    format!("-{count}-")
}
