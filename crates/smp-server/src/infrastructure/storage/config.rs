//! TOML-based configuration for the SMP server.
//!
//! The default file location is platform-specific:
//! - Windows:  `%APPDATA%\SMP\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/smp/config.toml` or `~/.config/smp/config.toml`
//! - macOS:    `~/Library/Application Support/SMP/config.toml`
//!
//! Example:
//!
//! ```toml
//! [server]
//! log_level = "info"
//!
//! [network]
//! bind_address = "127.0.0.1"
//! port = 5500
//! grace_period_ms = 1000
//! ```
//!
//! Every field has a serde default, so a partial file (or none at all) is
//! valid.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smp_core::{DEFAULT_GRACE_PERIOD, DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;

use crate::infrastructure::network::NetSettings;

/// Error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{value}': {source}")]
    InvalidBindAddress {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// General server behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address the listening socket binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port the listening socket binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Milliseconds each client gets to disconnect on its own at shutdown.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD.as_millis() as u64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            grace_period_ms: default_grace_period_ms(),
        }
    }
}

impl NetworkConfig {
    /// Validates the section into listener settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not an
    /// IPv4 or IPv6 address.
    pub fn to_settings(&self) -> Result<NetSettings, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddress {
                value: self.bind_address.clone(),
                source,
            })?;
        Ok(NetSettings {
            bind_addr: SocketAddr::new(ip, self.port),
            grace_period: Duration::from_millis(self.grace_period_ms),
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from the default location, returning defaults if the file
/// does not exist.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory for the server.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SMP"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("smp"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SMP")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn temp_config_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("smp_cfg_{tag}_{}", std::process::id()))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_network_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.network.bind_address, "127.0.0.1");
        assert_eq!(cfg.network.port, 5500);
        assert_eq!(cfg.network.grace_period_ms, 1000);
    }

    #[test]
    fn test_server_config_default_log_level_is_info() {
        assert_eq!(ServerConfig::default().log_level, "info");
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("empty config is valid");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_network_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[network]
port = 9999
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.network.port, 9999);
        assert_eq!(cfg.network.bind_address, "127.0.0.1");
        assert_eq!(cfg.server.log_level, "info");
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert_err!(result);
    }

    // ── NetSettings conversion ────────────────────────────────────────────────

    #[test]
    fn test_to_settings_combines_address_port_and_grace() {
        // Arrange
        let network = NetworkConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 6000,
            grace_period_ms: 250,
        };

        // Act
        let settings = assert_ok!(network.to_settings());

        // Assert
        assert_eq!(settings.bind_addr, "0.0.0.0:6000".parse().unwrap());
        assert_eq!(settings.grace_period, Duration::from_millis(250));
    }

    #[test]
    fn test_to_settings_accepts_ipv6() {
        let network = NetworkConfig {
            bind_address: "::1".to_string(),
            ..NetworkConfig::default()
        };
        let settings = assert_ok!(network.to_settings());
        assert!(settings.bind_addr.is_ipv6());
    }

    #[test]
    fn test_to_settings_rejects_hostname() {
        let network = NetworkConfig {
            bind_address: "not.an.ip".to_string(),
            ..NetworkConfig::default()
        };
        let result = network.to_settings();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidBindAddress { ref value, .. }) if value == "not.an.ip"
        ));
    }

    #[test]
    fn test_default_config_matches_default_net_settings() {
        let settings = assert_ok!(AppConfig::default().network.to_settings());
        assert_eq!(settings, NetSettings::default());
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        let cfg = assert_ok!(load_config_from(&path));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip_via_temp_dir() {
        // Arrange
        let dir = temp_config_dir("roundtrip");
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.network.port = 12345;
        cfg.server.log_level = "debug".to_string();

        // Act
        assert_ok!(save_config_to(&path, &cfg));
        let loaded = assert_ok!(load_config_from(&path));

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_from_malformed_file_returns_parse_error() {
        let dir = temp_config_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[network\nport = ").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
    }
}
