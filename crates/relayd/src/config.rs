//! Runtime configuration for the relay.
//!
//! Values come from three layers: built-in defaults, an optional TOML
//! file, and command-line overrides applied by the binary. Missing keys
//! in the file fall back to the defaults.
//!
//! ```toml
//! listen = "0.0.0.0:5000"
//! max_clients = 100
//! id_base = 10
//! outbox_capacity = 64
//! write_timeout_ms = 5000
//! close_timeout_ms = 2000
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::limits::{DEFAULT_ID_BASE, DEFAULT_MAX_CLIENTS};
use serde::Deserialize;
use thiserror::Error;

use crate::registry::RegistryConfig;
use crate::server::ConnectionSettings;

/// Default listening address.
pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000);

/// Default per-client outbound queue depth.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;

/// Default bound on a single socket write.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5000;

/// Default bound on flushing a connection at close.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 2000;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the listener binds to
    pub listen: SocketAddr,

    /// Maximum number of simultaneously active clients
    pub max_clients: usize,

    /// First client id handed out
    pub id_base: u32,

    /// Outbound queue depth per client
    pub outbox_capacity: usize,

    /// Bound on a single socket write, in milliseconds
    pub write_timeout_ms: u64,

    /// Bound on flushing queued lines at close, in milliseconds
    pub close_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN,
            max_clients: DEFAULT_MAX_CLIENTS,
            id_base: DEFAULT_ID_BASE,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }
}

impl RelayConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks the values the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("max_clients must be at least 1".into()));
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbox_capacity must be at least 1".into(),
            ));
        }
        if self.write_timeout_ms == 0 || self.close_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_clients: self.max_clients,
            id_base: self.id_base,
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            outbox_capacity: self.outbox_capacity,
            write_timeout: self.write_timeout(),
            close_timeout: self.close_timeout(),
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.listen.to_string(), "0.0.0.0:5000");
        assert_eq!(config.max_clients, 100);
        assert_eq!(config.id_base, 10);
        assert_eq!(config.write_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RelayConfig::from_toml_str("max_clients = 5\n").unwrap();
        assert_eq!(config.max_clients, 5);
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.id_base, 10);
        assert_eq!(config.registry_config().max_clients, 5);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RelayConfig::from_toml_str("max_client = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RelayConfig::from_toml_str("max_clients = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RelayConfig::from_toml_str("write_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen = \"127.0.0.1:6000\"").unwrap();
        writeln!(file, "id_base = 1").unwrap();

        let config = RelayConfig::load_file(file.path()).unwrap();
        assert_eq!(config.listen, SocketAddr::from(([127, 0, 0, 1], 6000)));
        assert_eq!(config.id_base, 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RelayConfig::load_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
