//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, locate_config, path_has_symlink_ancestor, ConfigLocation};
pub use types::{Config, DestinationAccount, LogLevel, SecretString, SourceContainer};
pub use xml::{create_template_config, load_config_from_xml_path, load_or_init, parse_config_str, LoadResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BLOB_BACKUP_CONFIG";

/// Copy program looked up on PATH when the config does not name one.
pub const COPY_TOOL_DEFAULT: &str = "azcopy";
