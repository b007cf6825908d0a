//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database. It is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BALLOT_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BALLOT_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "ballot.db";

/// Optional settings read from `config.toml`
///
/// Every field is optional; missing files or keys fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    /// JSON catalog imported at startup
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Locate and parse the platform config file
    ///
    /// A missing file is not an error. A malformed file is logged and ignored
    /// so the service still starts on defaults.
    pub fn discover() -> Option<Self> {
        let path = config_file_path().ok()?;
        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                Some(config)
            }
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                None
            }
        }
    }
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: Option<&TomlConfig>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root_folder) = toml_config.and_then(|c| c.root_folder.as_ref()) {
        return root_folder.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE))
}

/// Get the config file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ballot").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/ballot/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/ballot (or /var/lib/ballot for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("ballot"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ballot"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ballot"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ballot"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ballot"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ballot"))
    } else {
        PathBuf::from("./ballot_data")
    }
}
