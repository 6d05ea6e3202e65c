// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration
//!
//! Read once at startup from `LITEFED_*` environment variables, falling back
//! to per-user defaults.

use std::path::{Path, PathBuf};

use serde::Serialize;

const DEFAULT_PRIMARY_NAME: &str = "main";
const DEFAULT_MAX_PATH_ATTEMPTS: u32 = 100;
const DEFAULT_BROWSE_LIMIT: u32 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Application-private storage; holds the primary file and `main`-root databases.
    pub data_dir: PathBuf,
    /// File stem of the primary database.
    pub primary_name: String,
    /// When false, the gatekeeper refuses ATTACH/DETACH in user SQL.
    pub attach_unlocked: bool,
    pub log_dir: PathBuf,
    /// Upper bound on numeric suffixes tried when picking a new file path or alias.
    pub max_path_attempts: u32,
    /// Row limit for table browsing.
    pub browse_limit: u32,
}

impl AppConfig {
    pub fn load() -> Self {
        let data_dir = std::env::var_os("LITEFED_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let mut config = Self::with_data_dir(data_dir);

        if let Ok(primary) = std::env::var("LITEFED_PRIMARY_DB") {
            let primary = primary.trim();
            if !primary.is_empty() {
                config.primary_name = litefed_core::ident::logical_name(primary);
            }
        }
        if let Ok(flag) = std::env::var("LITEFED_ATTACH_UNLOCKED") {
            config.attach_unlocked = parse_bool(&flag).unwrap_or(false);
        }
        if let Some(log_dir) = std::env::var_os("LITEFED_LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }

        config
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            log_dir: data_dir.join("logs"),
            data_dir,
            primary_name: DEFAULT_PRIMARY_NAME.to_string(),
            attach_unlocked: false,
            max_path_attempts: DEFAULT_MAX_PATH_ATTEMPTS,
            browse_limit: DEFAULT_BROWSE_LIMIT,
        }
    }

    /// Directory for databases created while the `main` root is active.
    pub fn databases_dir(&self) -> PathBuf {
        self.data_dir.join("dbs")
    }

    pub fn primary_path(&self) -> PathBuf {
        self.databases_dir()
            .join(format!("{}.db", self.primary_name))
    }

    pub fn gate_locked(&self) -> bool {
        !self.attach_unlocked
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::load()
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("litefed");
    }
    let home = dirs::home_dir().unwrap_or_default();
    home.join(".litefed")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
