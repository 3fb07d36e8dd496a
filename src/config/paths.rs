//! Default path helpers and symlink checks.
//! Determines the config file location (flag, env, platform default) and the default tool log path.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV_VAR;

/// OS-appropriate default config path: `<config dir>/blob_backup/config.xml`.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(mut base) = config_dir() {
        base.push("blob_backup");
        base.push("config.xml");
        return Ok(base);
    }
    env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("blob_backup")
                .join("config.xml")
        })
        .map_err(|_| anyhow!("cannot determine a config directory (no platform config dir and HOME unset)"))
}

/// Where the config is read from, and whether that location was chosen explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Pick the config file: `--config` flag, then `$BLOB_BACKUP_CONFIG`, then the platform default.
pub fn locate_config(flag: Option<&Path>) -> Result<ConfigLocation> {
    if let Some(p) = flag {
        return Ok(ConfigLocation {
            path: p.to_path_buf(),
            explicit: true,
        });
    }
    if let Some(p) = env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(ConfigLocation {
            path: PathBuf::from(p),
            explicit: true,
        });
    }
    Ok(ConfigLocation {
        path: default_config_path()?,
        explicit: false,
    })
}

/// OS-appropriate default file for the tool's own log (data dir).
pub fn default_log_path() -> Option<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push("blob_backup");
        base.push("blob_backup.log");
        Some(base)
    } else {
        env::var("HOME").ok().map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join("blob_backup")
                .join("blob_backup.log")
        })
    }
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
