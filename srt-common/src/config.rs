//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration comes from three places:
//! 1. Command-line arguments (highest priority, applied by the binary)
//! 2. Environment variables (`SRT_ROOT_FOLDER`)
//! 3. TOML configuration file
//!
//! with built-in defaults filling anything left unset. A missing TOML file is
//! not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SRT_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "srt.db";

/// Pending-edit snapshot file name inside the root folder
pub const PENDING_FILE: &str = "pending_edits.json";

/// Bootstrap configuration loaded from TOML file
///
/// Cannot change while the service runs.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and pending-edit snapshot
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Path to SQLite database file (defaults to `<root>/srt.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// School scope passed to the persistence service
    #[serde(default = "default_school_id")]
    pub school_id: String,

    /// JSON file of indicator rows describing the assessment hierarchy
    #[serde(default)]
    pub hierarchy_path: Option<PathBuf>,

    /// Local snapshot of unsynced edits (defaults to `<root>/pending_edits.json`)
    #[serde(default)]
    pub pending_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            bind: default_bind(),
            port: default_port(),
            school_id: default_school_id(),
            hierarchy_path: None,
            pending_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5731
}

fn default_school_id() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from an explicit path, or the platform config
    /// location when `path` is `None`.
    ///
    /// An explicit path that cannot be read is an error. A missing platform
    /// config file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            return Self::from_toml_str(&text);
        }

        match locate_config_file() {
            Some(found) => {
                let text = std::fs::read_to_string(&found)?;
                info!("Loaded configuration from {}", found.display());
                Self::from_toml_str(&text)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform config file, if one exists
///
/// Linux checks `~/.config/srt/config.toml` then `/etc/srt/config.toml`;
/// other platforms check the user config directory only.
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("srt").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/srt/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution
///
/// Priority order:
/// 1. Command-line argument
/// 2. `SRT_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    toml_value: Option<&'a Path>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, toml_value: Option<&'a Path>) -> Self {
        Self {
            cli_arg,
            toml_value,
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml_value {
            return path.to_path_buf();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("srt"))
        .unwrap_or_else(|| PathBuf::from("./srt_data"))
}

/// Prepares the root folder and derives file locations inside it
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn pending_path(&self) -> PathBuf {
        self.root.join(PENDING_FILE)
    }
}
