use crate::domain::error::{FilterCtlError, FilterCtlResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Baud rate the filter controller firmware listens on
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Shortest blocking read the session worker may be configured with
pub const MIN_READ_TIMEOUT_MS: u64 = 10;

/// FilterCtl configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCtlConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Device connection defaults
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How long one-shot commands wait for :ACK / :NACK
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,
}

/// Device connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Serial port used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Blocking read timeout of the session worker
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// A single configuration file as found on disk. Keys that are absent
/// leave the previously loaded values untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceOverrides>,
}

/// `[global]` keys set by one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
}

/// `[device]` keys set by one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_response_timeout() -> u64 {
    3000
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout() -> u64 {
    1000
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            response_timeout_ms: default_response_timeout(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl GlobalConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl FilterCtlConfig {
    /// Overlay the keys present in `file` onto this configuration
    pub fn merge(&mut self, file: ConfigFile) {
        if let Some(global) = file.global {
            if let Some(log_level) = global.log_level {
                self.global.log_level = log_level;
            }
            if let Some(timeout) = global.response_timeout_ms {
                self.global.response_timeout_ms = timeout;
            }
        }
        if let Some(device) = file.device {
            if let Some(port) = device.port {
                self.device.port = Some(port);
            }
            if let Some(baud_rate) = device.baud_rate {
                self.device.baud_rate = baud_rate;
            }
            if let Some(timeout) = device.read_timeout_ms {
                self.device.read_timeout_ms = timeout;
            }
        }
    }

    pub fn validate(&self) -> FilterCtlResult<()> {
        if self.global.response_timeout_ms == 0 {
            return Err(FilterCtlError::Config {
                message: "global.response_timeout_ms must be greater than 0".to_string(),
            });
        }
        if self.device.read_timeout_ms < MIN_READ_TIMEOUT_MS {
            return Err(FilterCtlError::Config {
                message: format!(
                    "device.read_timeout_ms must be at least {} (got {})",
                    MIN_READ_TIMEOUT_MS, self.device.read_timeout_ms
                ),
            });
        }
        if self.device.baud_rate == 0 {
            return Err(FilterCtlError::Config {
                message: "device.baud_rate must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl From<FilterCtlConfig> for ConfigFile {
    fn from(config: FilterCtlConfig) -> Self {
        Self {
            global: Some(GlobalOverrides {
                log_level: Some(config.global.log_level),
                response_timeout_ms: Some(config.global.response_timeout_ms),
            }),
            device: Some(DeviceOverrides {
                port: config.device.port,
                baud_rate: Some(config.device.baud_rate),
                read_timeout_ms: Some(config.device.read_timeout_ms),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = FilterCtlConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: FilterCtlConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_device_defaults() {
        let config: FilterCtlConfig = toml::from_str("[device]\nport = \"/dev/ttyUSB0\"\n").unwrap();

        assert_eq!(config.device.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.device.baud_rate, 115_200);
        assert_eq!(config.device.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.global.log_level, "info");
    }

    #[test]
    fn test_merge_keeps_absent_sections() {
        let mut config = FilterCtlConfig::default();
        config.global.log_level = "debug".to_string();

        let file: ConfigFile = toml::from_str("[device]\nbaud_rate = 9600\n").unwrap();
        config.merge(file);

        assert_eq!(config.global.log_level, "debug");
        assert_eq!(config.device.baud_rate, 9600);
        assert!(config.device.port.is_none());
    }

    #[test]
    fn test_merge_keeps_unset_keys() {
        let mut config = FilterCtlConfig::default();
        config.device.port = Some("/dev/ttyUSB0".to_string());
        config.device.read_timeout_ms = 500;

        let file: ConfigFile = toml::from_str("[device]\nbaud_rate = 9600\n").unwrap();
        config.merge(file);

        assert_eq!(config.device.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.device.baud_rate, 9600);
        assert_eq!(config.device.read_timeout_ms, 500);
    }

    #[test]
    fn test_validate_read_timeout() {
        let mut config = FilterCtlConfig::default();
        assert!(config.validate().is_ok());

        config.device.read_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(FilterCtlError::Config { .. })));

        config.device.read_timeout_ms = MIN_READ_TIMEOUT_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_response_timeout() {
        let mut config = FilterCtlConfig::default();
        config.global.response_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
