//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template if the default config is missing.
//!
//! Notes:
//! - Unknown XML fields are rejected so misspelled keys surface before a run starts.
//! - Required fields are checked in `validate`; this module only maps XML to `Config`.

use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::paths::{locate_config, path_has_symlink_ancestor};
use super::types::{Config, DestinationAccount, LogLevel, SourceContainer};
use super::COPY_TOOL_DEFAULT;

use crate::errors::BackupError;
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};
use crate::resolve::DEFAULT_MAX_NAME_ATTEMPTS;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    destination_storage_account: Option<XmlAccount>,
    relative_log_path: Option<String>,
    source_containers: Option<XmlSourceList>,
    log_level: Option<String>,
    log_file: Option<String>,
    copy_tool: Option<String>,
    max_name_attempts: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlAccount {
    storage_account: Option<String>,
    storage_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlSourceList {
    #[serde(rename = "source_container", default)]
    source_container: Vec<XmlSourceContainer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlSourceContainer {
    storage_account: Option<String>,
    container_name: Option<String>,
    storage_key: Option<String>,
}

/// Outcome of looking for a config at startup.
#[derive(Debug)]
pub enum LoadResult {
    Loaded { config: Box<Config>, path: PathBuf },
    /// No config existed at the default location; a template was written there.
    CreatedTemplate(PathBuf),
}

fn trimmed(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn trimmed_opt(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// Map XmlConfig -> Config. Missing strings become empty and are caught by validate().
fn xml_to_config(parsed: XmlConfig, base_dir: PathBuf) -> Result<Config, BackupError> {
    let destination = parsed
        .destination_storage_account
        .map(|a| DestinationAccount::new(trimmed(a.storage_account), trimmed(a.storage_key).as_str()))
        .unwrap_or_else(|| DestinationAccount::new("", ""));

    let sources = parsed
        .source_containers
        .map(|l| l.source_container)
        .unwrap_or_default()
        .into_iter()
        .map(|s| {
            SourceContainer::new(
                trimmed(s.storage_account),
                trimmed(s.container_name),
                trimmed(s.storage_key).as_str(),
            )
        })
        .collect();

    let mut cfg = Config::new(destination, trimmed(parsed.relative_log_path), sources);
    cfg.base_dir = base_dir;

    if let Some(s) = trimmed_opt(parsed.log_level) {
        cfg.log_level = s
            .parse::<LogLevel>()
            .map_err(BackupError::Configuration)?;
    }
    cfg.log_file = trimmed_opt(parsed.log_file).map(|s| super::types::resolve_against(&cfg.base_dir, Path::new(&s)));
    cfg.copy_tool = trimmed_opt(parsed.copy_tool)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(COPY_TOOL_DEFAULT));
    cfg.max_name_attempts = match trimmed_opt(parsed.max_name_attempts) {
        Some(s) => s.parse::<u32>().map_err(|e| {
            BackupError::Configuration(format!("max_name_attempts '{s}' is not a valid count: {e}"))
        })?,
        None => DEFAULT_MAX_NAME_ATTEMPTS,
    };
    Ok(cfg)
}

/// Parse XML text into a validated Config. `base_dir` anchors relative paths.
pub fn parse_config_str(contents: &str, base_dir: &Path) -> Result<Config, BackupError> {
    let parsed: XmlConfig = from_xml_str(contents)
        .map_err(|e| BackupError::Configuration(format!("parse config xml: {e}")))?;
    let cfg = xml_to_config(parsed, base_dir.to_path_buf())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load and validate a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config, BackupError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        BackupError::Configuration(format!("read config xml '{}': {e}", path.display()))
    })?;

    let abs = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let base_dir = abs
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    parse_config_str(&contents, &base_dir).map_err(|e| match e {
        BackupError::Configuration(msg) => {
            BackupError::Configuration(format!("{} ({})", msg, path.display()))
        }
        other => other,
    })
}

/// Locate the config and load it. If the default location has no file, write a template instead.
/// An explicitly chosen path (flag or env) that does not exist is an error.
pub fn load_or_init(flag: Option<&Path>) -> Result<LoadResult, BackupError> {
    let loc = locate_config(flag).map_err(|e| BackupError::Configuration(e.to_string()))?;
    if !loc.path.exists() {
        if loc.explicit {
            return Err(BackupError::Configuration(format!(
                "config file not found: {}",
                loc.path.display()
            )));
        }
        create_template_config(&loc.path)
            .map_err(|e| BackupError::Configuration(format!("create template config: {e}")))?;
        return Ok(LoadResult::CreatedTemplate(loc.path));
    }
    let config = load_config_from_xml_path(&loc.path)?;
    Ok(LoadResult::Loaded {
        config: Box::new(config),
        path: loc.path,
    })
}

pub const TEMPLATE_CONFIG: &str = r#"<!--
  blob_backup configuration (XML)

    destination_storage_account -> account receiving the backup containers
    relative_log_path           -> directory for per-container copy logs
                                   (relative paths resolve against this file's directory)
    source_containers           -> one <source_container> per container to back up

  Optional:
    log_level                   -> quiet | normal | info | debug
    log_file                    -> file for blob_backup's own log
    copy_tool                   -> copy program name or path (default: azcopy)
    max_name_attempts           -> destination name probes before giving up (default: 1000)

  This file holds account keys. Keep it readable only by the backup user.
-->
<config>
  <destination_storage_account>
    <storage_account>destinationaccount</storage_account>
    <storage_key>REPLACE_WITH_BASE64_ACCOUNT_KEY</storage_key>
  </destination_storage_account>
  <relative_log_path>logs</relative_log_path>
  <source_containers>
    <source_container>
      <storage_account>sourceaccount</storage_account>
      <container_name>mycontainer</container_name>
      <storage_key>REPLACE_WITH_BASE64_ACCOUNT_KEY</storage_key>
    </source_container>
  </source_containers>
  <log_level>normal</log_level>
</config>
"#;

/// Create default template config file and parent directory (best-effort permissions).
/// Refuses to write through a symlinked ancestor.
pub fn create_template_config(path: &Path) -> anyhow::Result<()> {
    if path_has_symlink_ancestor(path)? {
        return Err(anyhow::anyhow!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    write_config_secure_new_0600(path, TEMPLATE_CONFIG.as_bytes())?;
    Ok(())
}
