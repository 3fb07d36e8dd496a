//! Core library for `blob_backup`.
//!
//! Copies every configured source blob container into a fresh, timestamp-named
//! container in a destination account, delegating the transfer to `azcopy` and
//! keeping one transcript file per container.
//!
//! Layout:
//! - `naming` / `resolve`: destination name generation and collision resolution
//! - `store`: destination container existence and creation (Azure REST)
//! - `copy_tool`: the external copy program
//! - `backup`: per-container orchestration
//! - `config`, `cli`, `output`, `platform`, `lock`: the surrounding shell

pub mod backup;
pub mod cli;
pub mod config;
pub mod copy_tool;
pub mod errors;
pub mod lock;
pub mod naming;
pub mod output;
pub mod platform;
pub mod resolve;
pub mod store;

pub use backup::{BackupOrchestrator, BackupRun, BackupState, RunContext, RunSummary};
pub use config::{
    default_config_path, default_log_path, load_config_from_xml_path, path_has_symlink_ancestor,
    Config, DestinationAccount, LogLevel, SecretString, SourceContainer,
};
pub use copy_tool::{AzCopy, CopyOutcome, CopyRequest, CopyTool};
pub use errors::BackupError;
pub use naming::{generate_name, shorten, MAX_CONTAINER_NAME_LEN};
pub use resolve::{resolve_destination_name, NamePolicy, ResolvedName};
pub use store::{blob_container_url, AzureBlobStore, DestinationStore};
