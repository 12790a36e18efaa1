//! Configuration loading and data folder resolution
//!
//! Bootstrap settings come from a small TOML file. Every setting has a
//! compiled default so a missing or partial file never stops startup.
//!
//! # Resolution priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ARTA_DATA_DIR`)
//! 3. TOML config file (`<config_dir>/arta/<module>.toml`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "ARTA_DATA_DIR";

/// Bootstrap configuration loaded from TOML
///
/// All fields are optional; absent values fall back to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder receiving CSV exports
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Streaming service credentials
    #[serde(default)]
    pub spotify: SpotifyConfig,

    /// Defaults offered by the conversational front-end
    #[serde(default)]
    pub analysis: AnalysisDefaults,

    /// HTTP adapter port
    #[serde(default)]
    pub port: Option<u16>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
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

/// Client-credentials pair for the streaming service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Front-end defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDefaults {
    /// Genre suggested when the user has none in mind
    #[serde(default = "default_genre")]
    pub default_genre: String,

    /// Artist count used when the user submits an empty count
    #[serde(default = "default_artists_count")]
    pub default_artists_count: u32,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            default_genre: default_genre(),
            default_artists_count: default_artists_count(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_genre() -> String {
    "metal".to_string()
}

fn default_artists_count() -> u32 {
    100
}

/// Compiled defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub port: u16,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_file: None,
            port: 5740,
        }
    }
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/arta
        dirs::data_local_dir()
            .map(|d| d.join("arta"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/arta"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("arta"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/arta"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("arta"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\arta"))
    } else {
        PathBuf::from("./arta_data")
    }
}

/// Path of the TOML file for a module, e.g. `~/.config/arta/arta-collector.toml`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("arta").join(format!("{}.toml", module_name)))
}

/// Load TOML configuration
///
/// A missing file is not an error: defaults are returned and a warning is
/// logged. A present but unparsable file is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves the data folder following the documented priority order
pub struct DataDirResolver {
    cli_override: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl DataDirResolver {
    pub fn new(cli_override: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_override,
            toml_value: toml_config.data_dir.clone(),
        }
    }

    /// Resolve the data folder; never fails
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            debug!("Data folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(DATA_DIR_ENV) {
            if !path.trim().is_empty() {
                debug!("Data folder from {}: {}", DATA_DIR_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            debug!("Data folder from TOML: {}", path.display());
            return path.clone();
        }

        CompiledDefaults::for_current_platform().data_dir
    }
}

/// Creates the data folder layout on first use
pub struct DataDirInitializer {
    data_dir: PathBuf,
}

impl DataDirInitializer {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Create the data folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.data_dir.exists() {
            info!("Creating data folder: {}", self.data_dir.display());
        }
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Folder receiving CSV exports
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
