//! Service configuration.
//!
//! Loaded once at startup from a YAML file with `GSMSRV_`-prefixed
//! environment overrides, and treated as static for the process lifetime.

use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{GsmError, Result};

/// GSM channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GsmConfig {
    /// Serial device path (e.g., "/dev/ttyUSB0")
    #[serde(default = "default_device")]
    pub device: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Trusted contact numbers: command allow-list and notification fan-out
    #[serde(default)]
    pub contacts: Vec<String>,
    /// Read timeout for individual transport operations
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Settle delay after each modem write, before draining the response
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Backoff before re-attempting a failed modem connection
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// USSD code issued at init time for a one-shot balance query
    #[serde(default = "default_balance_ussd")]
    pub balance_ussd: String,
}

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_reconnect_delay_secs() -> u64 {
    10
}

fn default_balance_ussd() -> String {
    "*111#".to_string()
}

impl Default for GsmConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            contacts: Vec::new(),
            read_timeout_ms: default_read_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            balance_ussd: default_balance_ussd(),
        }
    }
}

impl GsmConfig {
    /// Load configuration from a YAML file, with environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let config: GsmConfig = Figment::from(Serialized::defaults(GsmConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("GSMSRV_"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(GsmError::config("Device path cannot be empty"));
        }

        if self.baud_rate == 0 {
            return Err(GsmError::config("Baud rate must be greater than zero"));
        }

        if self.read_timeout_ms == 0 {
            return Err(GsmError::config("Read timeout must be greater than zero"));
        }

        if self.reconnect_delay_secs == 0 {
            return Err(GsmError::config(
                "Reconnect delay must be greater than zero",
            ));
        }

        if self.balance_ussd.is_empty() {
            return Err(GsmError::config("Balance USSD code cannot be empty"));
        }

        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Whether a sender address is on the trusted contact list.
    pub fn is_trusted(&self, source: &str) -> bool {
        self.contacts.iter().any(|c| c == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_validation() {
        let mut config = GsmConfig::default();
        assert!(config.validate().is_ok());

        config.device = String::new();
        assert!(config.validate().is_err());

        config.device = "/dev/ttyUSB0".to_string();
        config.baud_rate = 0;
        assert!(config.validate().is_err());

        config.baud_rate = 9600;
        config.read_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.read_timeout_ms = 1000;
        config.balance_ussd = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trusted_contacts() {
        let config = GsmConfig {
            contacts: vec!["+351911234567".to_string(), "+351967654321".to_string()],
            ..Default::default()
        };

        assert!(config.is_trusted("+351911234567"));
        assert!(!config.is_trusted("+351900000000"));
        assert!(!config.is_trusted(""));
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "device: /dev/ttyS1\nbaud_rate: 115200\ncontacts:\n  - \"+351911234567\""
        )
        .unwrap();

        let config = GsmConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.device, "/dev/ttyS1");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.contacts, vec!["+351911234567".to_string()]);
        // Untouched fields keep their defaults
        assert_eq!(config.settle_delay_ms, 100);
        assert_eq!(config.balance_ussd, "*111#");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = GsmConfig::load("/nonexistent/gsmsrv.yaml").unwrap();
        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert!(config.contacts.is_empty());
    }
}
