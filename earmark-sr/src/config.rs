//! Configuration loading
//!
//! Bootstrap configuration comes from an optional TOML file; command-line
//! flags and environment variables (via clap's env support in `main`)
//! override it. A missing config file falls back to defaults so the binary
//! runs out of the box.

use earmark_common::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw TOML shape; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub songs_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
}

/// Command-line / environment overrides applied on top of the TOML file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_path: Option<PathBuf>,
    pub songs_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog database file
    pub database_path: PathBuf,

    /// Directory that relative song paths resolve against
    pub songs_dir: PathBuf,

    /// HTTP bind host
    pub host: String,

    /// HTTP bind port
    pub port: u16,

    /// Allowed CORS origins; `"*"` means any
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("earmark.sqlite"),
            songs_dir: PathBuf::from("songs"),
            host: "0.0.0.0".into(),
            port: 5730,
            allowed_origins: vec!["*".into()],
        }
    }
}

impl Config {
    /// Load configuration: TOML file (when present) + overrides + defaults.
    pub async fn load(config_path: &Path, overrides: Overrides) -> Result<Self> {
        let toml_config = if config_path.exists() {
            let text = tokio::fs::read_to_string(config_path)
                .await
                .map_err(|e| Error::Config(format!("failed to read config file: {e}")))?;
            let parsed: TomlConfig = toml::from_str(&text)
                .map_err(|e| Error::Config(format!("failed to parse TOML: {e}")))?;
            info!(path = %config_path.display(), "loaded configuration file");
            parsed
        } else {
            debug!(path = %config_path.display(), "no config file, using defaults");
            TomlConfig::default()
        };

        let defaults = Config::default();
        Ok(Config {
            database_path: overrides
                .database_path
                .or(toml_config.database_path)
                .unwrap_or(defaults.database_path),
            songs_dir: overrides
                .songs_dir
                .or(toml_config.songs_dir)
                .unwrap_or(defaults.songs_dir),
            host: overrides.host.or(toml_config.host).unwrap_or(defaults.host),
            port: overrides.port.or(toml_config.port).unwrap_or(defaults.port),
            allowed_origins: overrides
                .allowed_origins
                .or(toml_config.allowed_origins)
                .unwrap_or(defaults.allowed_origins),
        })
    }

    /// Resolve a song path: absolute stays as-is, relative joins `songs_dir`.
    pub fn resolve_song_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.songs_dir.join(p)
        }
    }
}
