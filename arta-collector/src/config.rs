//! Configuration resolution for arta-collector
//!
//! Streaming credentials resolve with ENV → TOML priority; the data folder
//! and port add the command line on top.

use crate::services::spotify_client::SpotifyCredentials;
use arta_common::config::{CompiledDefaults, DataDirInitializer, DataDirResolver, TomlConfig};
use arta_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

pub const SPOTIFY_CLIENT_ID_ENV: &str = "ARTA_SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_ENV: &str = "ARTA_SPOTIFY_CLIENT_SECRET";
/// Module name, also the TOML file stem
pub const MODULE_NAME: &str = "arta-collector";

/// Validate a credential value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// One credential value from ENV, then TOML
fn resolve_value(env_name: &str, toml_value: Option<&String>, label: &str) -> Option<String> {
    let env_value = std::env::var(env_name).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "Spotify {} found in environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("Spotify {} loaded from environment variable", label);
        return Some(value);
    }
    if let Some(value) = toml_value {
        info!("Spotify {} loaded from TOML config", label);
        return Some(value.clone());
    }
    None
}

/// Resolve streaming client credentials
///
/// **Priority:** ENV → TOML
pub fn resolve_spotify_credentials(toml_config: &TomlConfig) -> Result<SpotifyCredentials> {
    let client_id = resolve_value(
        SPOTIFY_CLIENT_ID_ENV,
        toml_config.spotify.client_id.as_ref(),
        "client id",
    );
    let client_secret = resolve_value(
        SPOTIFY_CLIENT_SECRET_ENV,
        toml_config.spotify.client_secret.as_ref(),
        "client secret",
    );

    match (client_id, client_secret) {
        (Some(id), Some(secret)) => Ok(SpotifyCredentials::new(id, secret)),
        _ => Err(Error::Config(format!(
            "Spotify credentials not configured. Please configure using one of:\n\
             1. Environment: {}=... and {}=...\n\
             2. TOML config: ~/.config/arta/{}.toml\n   \
                [spotify]\n   client_id = \"...\"\n   client_secret = \"...\"\n\
             \n\
             Create an app at: https://developer.spotify.com/dashboard",
            SPOTIFY_CLIENT_ID_ENV, SPOTIFY_CLIENT_SECRET_ENV, MODULE_NAME
        ))),
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub data_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub port: u16,
    pub log_level: String,
    pub default_genre: String,
    pub default_count: u32,
}

impl CollectorSettings {
    /// Combine command-line overrides with the loaded TOML and compiled defaults
    pub fn resolve(
        cli_data_dir: Option<PathBuf>,
        cli_port: Option<u16>,
        toml_config: &TomlConfig,
    ) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let data_dir = DataDirResolver::new(cli_data_dir, toml_config).resolve();
        let exports_dir = DataDirInitializer::new(data_dir.clone()).exports_dir();

        Self {
            data_dir,
            exports_dir,
            port: cli_port.or(toml_config.port).unwrap_or(defaults.port),
            log_level: toml_config.logging.level.clone(),
            default_genre: toml_config.analysis.default_genre.clone(),
            default_count: toml_config.analysis.default_artists_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    fn test_settings_cli_port_wins() {
        let toml_config = TomlConfig {
            port: Some(9000),
            data_dir: Some(PathBuf::from("/srv/arta")),
            ..Default::default()
        };
        let settings = CollectorSettings::resolve(
            Some(PathBuf::from("/cli/arta")),
            Some(8080),
            &toml_config,
        );
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.data_dir, PathBuf::from("/cli/arta"));
        assert_eq!(settings.exports_dir, PathBuf::from("/cli/arta/exports"));
        assert_eq!(settings.default_count, 100);
    }

    #[test]
    fn test_settings_port_falls_back_to_toml_then_default() {
        let toml_config = TomlConfig {
            port: Some(9000),
            ..Default::default()
        };
        let settings = CollectorSettings::resolve(Some(PathBuf::from("/x")), None, &toml_config);
        assert_eq!(settings.port, 9000);

        let settings = CollectorSettings::resolve(Some(PathBuf::from("/x")), None, &TomlConfig::default());
        assert_eq!(settings.port, 5740);
    }
}
