//! Configuration management for armctl
//!
//! Provides configuration file handling, defaults and validation.
//! Supports JSON and TOML file formats, chosen by file extension, stored by
//! default in the platform config directory (`<config_dir>/armctl/config.toml`).
//!
//! Configuration is organized into logical sections:
//! - Connection settings (driver, port, timeouts, status polling)
//! - Motion settings (preset pacing, wave mode, initial speed)
//! - Event settings (history size)

use crate::error::{SettingsError, SettingsResult};
use armctl_communication::protocol::{MAX_SPEED_MS, MIN_SPEED_MS};
use armctl_communication::{
    ConnectionDriver, ConnectionParams, ControllerConfig, DispatcherConfig, PresetPacing,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "armctl";
const CONFIG_FILE: &str = "config.toml";

/// Connection protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Serial/USB connection
    #[default]
    Serial,
    /// TCP/IP connection to a serial bridge
    Tcp,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

impl From<ConnectionType> for ConnectionDriver {
    fn from(value: ConnectionType) -> Self {
        match value {
            ConnectionType::Serial => ConnectionDriver::Serial,
            ConnectionType::Tcp => ConnectionDriver::Tcp,
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Link kind
    pub driver: ConnectionType,
    /// Serial port or `host:port`; empty means "give it on the command line"
    pub port: String,
    /// Baud rate for serial connections
    pub baud_rate: u32,
    /// Receive timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Status poll interval in milliseconds, 0 disables polling
    pub status_poll_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            driver: ConnectionType::Serial,
            port: String::new(),
            baud_rate: 115_200,
            read_timeout_ms: 1000,
            connect_timeout_ms: 5000,
            status_poll_ms: 1000,
        }
    }
}

/// Motion settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Delay between pick/place preset steps in milliseconds
    pub pick_place_delay_ms: u64,
    /// Delay between wave steps in milliseconds
    pub wave_delay_ms: u64,
    /// Let the device run WAVE itself instead of expanding it
    pub native_wave: bool,
    /// Speed sent right after connecting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_speed_ms: Option<u32>,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            pick_place_delay_ms: 100,
            wave_delay_ms: 500,
            native_wave: false,
            default_speed_ms: None,
        }
    }
}

/// Event settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Number of recent events kept for diagnostics
    pub history_size: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self { history_size: 50 }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Motion settings
    pub motion: MotionSettings,
    /// Event settings
    pub events: EventSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }

    /// Load the default config file, falling back to defaults when it is absent
    pub fn load_or_default() -> SettingsResult<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let load_error = |reason: String| SettingsError::LoadError {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let config: Self = match format {
            Format::Json => serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?,
            Format::Toml => toml::from_str(&content).map_err(|e| load_error(e.to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let format = format_of(path)?;
        let save_error = |reason: String| SettingsError::SaveError {
            path: path.display().to_string(),
            reason,
        };

        let content = match format {
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|e| save_error(e.to_string()))?
            }
            Format::Toml => toml::to_string_pretty(self).map_err(|e| save_error(e.to_string()))?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::ConfigDirectory(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_error(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let connection = &self.connection;
        if connection.baud_rate == 0 {
            return Err(SettingsError::invalid("connection.baud_rate", "must be > 0"));
        }
        if connection.read_timeout_ms == 0 {
            return Err(SettingsError::invalid("connection.read_timeout_ms", "must be > 0"));
        }
        if connection.connect_timeout_ms == 0 {
            return Err(SettingsError::invalid("connection.connect_timeout_ms", "must be > 0"));
        }

        if let Some(speed) = self.motion.default_speed_ms {
            if !(MIN_SPEED_MS..=MAX_SPEED_MS).contains(&speed) {
                return Err(SettingsError::invalid(
                    "motion.default_speed_ms",
                    format!("{} outside {}..={}", speed, MIN_SPEED_MS, MAX_SPEED_MS),
                ));
            }
        }

        Ok(())
    }

    /// Link parameters, with `port` overriding the configured one
    pub fn connection_params(&self, port: Option<&str>) -> ConnectionParams {
        let connection = &self.connection;
        ConnectionParams {
            driver: connection.driver.into(),
            port: port.unwrap_or(&connection.port).to_string(),
            baud_rate: connection.baud_rate,
            read_timeout: Duration::from_millis(connection.read_timeout_ms),
            connect_timeout: Duration::from_millis(connection.connect_timeout_ms),
            status_poll_interval: (connection.status_poll_ms > 0)
                .then(|| Duration::from_millis(connection.status_poll_ms)),
        }
    }

    /// Engine behaviour derived from the motion and event sections
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            dispatcher: DispatcherConfig {
                pacing: PresetPacing {
                    pick_place: Duration::from_millis(self.motion.pick_place_delay_ms),
                    wave: Duration::from_millis(self.motion.wave_delay_ms),
                },
                native_wave: self.motion.native_wave,
            },
            history_size: self.events.history_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.baud_rate, 115_200);
        assert_eq!(config.motion.wave_delay_ms, 500);
        assert_eq!(config.events.history_size, 50);
    }

    #[test]
    fn test_validate_speed_range() {
        let mut config = Config::default();
        config.motion.default_speed_ms = Some(250);
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));
        config.motion.default_speed_ms = Some(200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_params_mapping() {
        let mut config = Config::default();
        config.connection.port = "/dev/ttyUSB0".to_string();

        let params = config.connection_params(None);
        assert_eq!(params.port, "/dev/ttyUSB0");
        assert_eq!(params.read_timeout, Duration::from_secs(1));
        assert_eq!(params.status_poll_interval, Some(Duration::from_secs(1)));

        config.connection.status_poll_ms = 0;
        let params = config.connection_params(Some("COM4"));
        assert_eq!(params.port, "COM4");
        assert!(params.status_poll_interval.is_none());
    }

    #[test]
    fn test_controller_config_mapping() {
        let mut config = Config::default();
        config.motion.native_wave = true;
        let controller = config.controller_config();
        assert!(controller.dispatcher.native_wave);
        assert_eq!(
            controller.dispatcher.pacing.pick_place,
            Duration::from_millis(100)
        );
        assert_eq!(controller.history_size, 50);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            Config::load_from_file(Path::new("armctl.yaml")),
            Err(SettingsError::UnsupportedFormat(_))
        ));
    }
}
