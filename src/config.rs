//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every non-API path
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// How long live connections get to close after a shutdown signal
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            assets_dir: default_assets_dir(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind, as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human readable
    #[default]
    Pretty,
    /// Single line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                key: "logging.format",
                value: other.to_string(),
            }),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Default config file locations, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("wszero").join("config.toml")),
            Some(PathBuf::from("/etc/wszero/config.toml")),
            Some(PathBuf::from("./wszero.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from an explicit path, or else the first default location that
    /// exists, or else defaults. Environment overrides apply in every case.
    ///
    /// An explicit path that cannot be loaded is an error; a broken file in a
    /// default location is skipped and reported in [`Discovered::skipped`].
    pub fn discover(explicit: Option<&Path>) -> Result<Discovered, ConfigError> {
        Self::discover_in(explicit, &Self::default_paths())
    }

    /// [`Config::discover`] over an explicit list of candidate locations
    pub fn discover_in(
        explicit: Option<&Path>,
        candidates: &[PathBuf],
    ) -> Result<Discovered, ConfigError> {
        if let Some(path) = explicit {
            return Ok(Discovered {
                config: Self::load_with_env(path)?,
                source: Some(path.to_path_buf()),
                skipped: Vec::new(),
            });
        }

        let mut skipped = Vec::new();
        for path in candidates {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        return Ok(Discovered {
                            config,
                            source: Some(path.clone()),
                            skipped,
                        })
                    }
                    Err(e) => skipped.push((path.clone(), e)),
                }
            }
        }

        Ok(Discovered {
            config: Self::from_env()?,
            source: None,
            skipped,
        })
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `WSZERO_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("WSZERO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("WSZERO_PORT") {
            self.server.port = parse_value("WSZERO_PORT", &port)?;
        }
        if let Some(dir) = lookup("WSZERO_ASSETS_DIR") {
            self.server.assets_dir = dir;
        }

        // Hub overrides
        if let Some(max) = lookup("WSZERO_MAX_CONNECTIONS") {
            self.hub.max_connections = parse_value("WSZERO_MAX_CONNECTIONS", &max)?;
        }

        // Logging overrides
        if let Some(level) = lookup("WSZERO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("WSZERO_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }
}

/// Result of [`Config::discover`]
#[derive(Debug)]
pub struct Discovered {
    pub config: Config,
    /// File the config was read from, `None` for defaults
    pub source: Option<PathBuf>,
    /// Files that existed but could not be loaded, in search order
    pub skipped: Vec<(PathBuf, ConfigError)>,
}

impl Discovered {
    /// Report the outcome through `tracing`; call once logging is installed
    pub fn log(&self) {
        for (path, error) in &self.skipped {
            tracing::warn!("Failed to load config from {:?}: {}", path, error);
        }
        match &self.source {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::info!("Using default config with environment overrides"),
        }
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# wszero Configuration
#
# Environment variables override these settings:
# - WSZERO_HOST
# - WSZERO_PORT
# - WSZERO_ASSETS_DIR
# - WSZERO_MAX_CONNECTIONS
# - WSZERO_LOG_LEVEL
# - WSZERO_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8000

# Directory with index.html and js/wszero.js
assets_dir = "assets"

# Seconds live connections get to close on shutdown
shutdown_grace_secs = 5

[hub]
# Maximum number of concurrent WebSocket connections
max_connections = 1024

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "info"

# Log format: pretty, compact or json
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8000");
        assert_eq!(config.server.assets_dir, "assets");
        assert_eq!(config.server.shutdown_grace_secs, 5);
        assert_eq!(config.hub.max_connections, 1024);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_generated_default_parses_to_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.server.addr(), defaults.server.addr());
        assert_eq!(config.server.assets_dir, defaults.server.assets_dir);
        assert_eq!(config.hub.max_connections, defaults.hub.max_connections);
        assert_eq!(config.logging.format, defaults.logging.format);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9001\n\n[hub]\nmax_connections = 3\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.hub.max_connections, 3);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[server\nport = ").unwrap();
        match Config::load(&broken) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected parse error, got {:?}", other),
        }

        let bad_format = dir.path().join("bad_format.toml");
        std::fs::write(&bad_format, "[logging]\nformat = \"xml\"\n").unwrap();
        assert!(matches!(
            Config::load(&bad_format),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("WSZERO_HOST", "127.0.0.1"),
                ("WSZERO_PORT", "8123"),
                ("WSZERO_ASSETS_DIR", "/srv/www"),
                ("WSZERO_MAX_CONNECTIONS", "10"),
                ("WSZERO_LOG_LEVEL", "debug"),
                ("WSZERO_LOG_FORMAT", "Compact"),
            ]))
            .unwrap();

        assert_eq!(config.server.addr(), "127.0.0.1:8123");
        assert_eq!(config.server.assets_dir, "/srv/www");
        assert_eq!(config.hub.max_connections, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup(&[("WSZERO_PORT", "eighty")]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "WSZERO_PORT",
                ..
            })
        ));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_discover_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wszero.toml");
        std::fs::write(&path, "[server]\nassets_dir = \"public\"\n").unwrap();

        let found = Config::discover(Some(&path)).unwrap();
        assert_eq!(found.source, Some(path));
        assert_eq!(found.config.server.assets_dir, "public");
        assert!(found.skipped.is_empty());

        let missing = dir.path().join("nope.toml");
        assert!(Config::discover(Some(&missing)).is_err());
    }

    #[test]
    fn test_discover_reports_broken_default_file() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("wszero.toml");
        std::fs::write(&broken, "[server\nport = ").unwrap();
        let absent = dir.path().join("absent.toml");

        let found = Config::discover_in(None, &[absent, broken.clone()]).unwrap();

        assert_eq!(found.source, None);
        assert_eq!(found.skipped.len(), 1);
        assert_eq!(found.skipped[0].0, broken);
        assert!(matches!(found.skipped[0].1, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_discover_falls_through_to_next_location() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "not toml at all [").unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[hub]\nmax_connections = 7\n").unwrap();

        let found = Config::discover_in(None, &[broken.clone(), good.clone()]).unwrap();

        assert_eq!(found.source, Some(good));
        assert_eq!(found.config.hub.max_connections, 7);
        assert_eq!(found.skipped.len(), 1);
        assert_eq!(found.skipped[0].0, broken);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
