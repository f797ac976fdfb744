//! Configuration management for the workspace gateway
//!
//! Separates startup configuration (requires restart) from runtime settings
//! (can be flipped while the process runs, e.g. from the settings UI).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Complete gateway configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub settings: Settings,
}

/// Configuration that requires a process restart to take effect.
/// These values are loaded once during initialization.
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    /// IP address to bind the gateway control connection (restart required)
    pub bind_address: String,

    /// Port for the gateway control connection (restart required)
    pub control_port: u16,

    /// Port range for passive-mode data connections (restart required)
    pub data_port_min: u16,
    pub data_port_max: u16,

    /// Workspace root directory; the confinement boundary for every file
    /// operation (restart required)
    pub workspace_root: String,

    /// Maximum concurrent gateway sessions (restart required)
    pub max_clients: usize,

    /// Maximum command line length on the control connection (restart required)
    pub max_command_length: usize,

    /// Maximum upload size in MB (restart required)
    pub max_file_size_mb: u64,
}

/// Settings the gateway re-reads at runtime.
///
/// `gateway_enabled` is consulted on every `reconcile()`; flipping it and
/// reconciling is how the settings UI starts and stops the service.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Whether the file-transfer gateway should be running
    pub gateway_enabled: bool,

    /// Host advertised to clients in passive-mode replies; relevant when the
    /// server sits behind NAT or a container boundary
    pub advertised_address: String,
}

/// Thread-safe runtime settings handle shared with the lifecycle
pub type SharedSettings = Arc<RwLock<Settings>>;

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            data_port_min: 2122,
            data_port_max: 2222,
            workspace_root: "./workspace_root".to_string(),
            max_clients: 10,
            max_command_length: 512,
            max_file_size_mb: 100,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_enabled: false,
            advertised_address: "127.0.0.1".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration: built-in defaults, then an optional `gateway.toml`,
    /// then `GATEWAY_*` environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = StartupConfig::default();
        let settings = Settings::default();

        let loaded = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", defaults.control_port as i64)?
            .set_default("data_port_min", defaults.data_port_min as i64)?
            .set_default("data_port_max", defaults.data_port_max as i64)?
            .set_default("workspace_root", defaults.workspace_root)?
            .set_default("max_clients", defaults.max_clients as i64)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .set_default("max_file_size_mb", defaults.max_file_size_mb as i64)?
            .set_default("gateway_enabled", settings.gateway_enabled)?
            .set_default("advertised_address", settings.advertised_address)?
            .add_source(File::with_name("gateway").required(false))
            .add_source(Environment::with_prefix("GATEWAY"))
            .build()?;

        let config: GatewayConfig = loaded.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Split into startup (immutable) and settings (mutable) parts
    pub fn split(self) -> (StartupConfig, SharedSettings) {
        let settings = Arc::new(RwLock::new(self.settings));
        (self.startup, settings)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.data_port_min >= self.startup.data_port_max {
            return Err(config::ConfigError::Message(
                "data_port_min must be less than data_port_max".into(),
            ));
        }

        if self.startup.workspace_root.is_empty() {
            return Err(config::ConfigError::Message(
                "workspace_root cannot be empty".into(),
            ));
        }

        if self.startup.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.startup.max_command_length == 0 {
            return Err(config::ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        if self.startup.max_file_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Get bind address and control port as a socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Get the data port range for passive mode
    pub fn data_port_range(&self) -> std::ops::Range<u16> {
        self.data_port_min..self.data_port_max
    }

    /// Get the workspace root as a PathBuf
    pub fn workspace_root_path(&self) -> PathBuf {
        PathBuf::from(&self.workspace_root)
    }

    /// Get maximum upload size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = GatewayConfig {
            startup: StartupConfig::default(),
            settings: Settings::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_data_port_range_is_rejected() {
        let mut startup = StartupConfig::default();
        startup.data_port_min = 3000;
        startup.data_port_max = 2000;
        let config = GatewayConfig {
            startup,
            settings: Settings::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn control_socket_joins_address_and_port() {
        let startup = StartupConfig::default();
        assert_eq!(startup.control_socket(), "127.0.0.1:2121");
    }
}
