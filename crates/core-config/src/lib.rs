//! Configuration loading and parsing.
//!
//! Parses `rtedit.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [undo]
//! capacity = 100
//!
//! [log]
//! filter = "info"
//! dir = "."
//! ```
//!
//! Missing files and parse errors both fall back to defaults. Unknown fields
//! are ignored. The undo capacity is clamped to `UNDO_CAPACITY_MIN..=UNDO_CAPACITY_MAX`;
//! the raw value is kept alongside the effective one.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "rtedit.toml";
pub const UNDO_CAPACITY_MIN: usize = 1;
pub const UNDO_CAPACITY_MAX: usize = 10_000;

#[derive(Debug, Deserialize, Clone)]
pub struct UndoConfig {
    #[serde(default = "UndoConfig::default_capacity")]
    pub capacity: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
        }
    }
}

impl UndoConfig {
    const fn default_capacity() -> usize {
        100
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "LogConfig::default_filter")]
    pub filter: String,
    #[serde(default = "LogConfig::default_dir")]
    pub dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
            dir: Self::default_dir(),
        }
    }
}

impl LogConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
    fn default_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>,            // original file string (optional)
    pub file: ConfigFile,               // parsed (or default) data
    pub effective_undo_capacity: usize, // clamped
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Local `rtedit.toml` first, then the platform config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("rtedit").join(CONFIG_FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config::from_file(Some(content), file)),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let mut cfg = Self {
            raw,
            file,
            effective_undo_capacity: 0,
        };
        cfg.apply_limits();
        cfg
    }

    /// Clamp the undo capacity into its allowed range. Returns the effective value.
    pub fn apply_limits(&mut self) -> usize {
        let raw = self.file.undo.capacity;
        let clamped = raw.clamp(UNDO_CAPACITY_MIN, UNDO_CAPACITY_MAX);
        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                min = UNDO_CAPACITY_MIN,
                max = UNDO_CAPACITY_MAX,
                "undo_capacity_clamped"
            );
        }
        self.effective_undo_capacity = clamped;
        clamped
    }

    pub fn log_filter(&self) -> &str {
        &self.file.log.filter
    }

    pub fn log_dir(&self) -> &PathBuf {
        &self.file.log.dir
    }
}
