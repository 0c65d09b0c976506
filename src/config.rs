//! Link configuration.
//!
//! A link endpoint is configured from a small TOML document:
//!
//! ```toml
//! radio_port = 0
//! key_file = "/etc/wfb/tx.key"
//! rekey_interval_ms = 1000
//! announce_interval_ms = 1000
//! max_packet_size = 1510
//! rx_interfaces = 2
//!
//! [mcs]
//! index = 1
//! bandwidth = "bw40"
//! short_gi = true
//! greenfield = false
//! ```
//!
//! Every field is optional; missing fields take the defaults above (no key
//! file, one receive interface).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{ConfigError, FrameBudget, MAX_PACKET_SIZE, MAX_RX_INTERFACES};
use crate::crypto::{KeySchedule, LinkKeys, TxKeyManager};
use crate::frame::McsParams;
use crate::link::{Receiver, Transmitter};

/// One link endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Logical stream carried by this link.
    pub radio_port: u8,
    /// Injection rate.
    pub mcs: McsParams,
    /// 64-byte key file (own secret, peer public).
    pub key_file: Option<PathBuf>,
    /// Milliseconds a session key stays in use.
    pub rekey_interval_ms: u64,
    /// Milliseconds between session key announcements.
    pub announce_interval_ms: u64,
    /// Frame ceiling, headers included.
    pub max_packet_size: usize,
    /// Capture interfaces feeding the receiver.
    pub rx_interfaces: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let schedule = KeySchedule::default();
        Self {
            radio_port: 0,
            mcs: McsParams::DEFAULT,
            key_file: None,
            rekey_interval_ms: schedule.rekey_interval.as_millis() as u64,
            announce_interval_ms: schedule.announce_interval.as_millis() as u64,
            max_packet_size: MAX_PACKET_SIZE,
            rx_interfaces: 1,
        }
    }
}

impl LinkConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mcs.index > 31 {
            return Err(ConfigError::Invalid {
                field: "mcs.index",
                reason: format!("{} is above 31", self.mcs.index),
            });
        }
        if self.rekey_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rekey_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if self.announce_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "announce_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if !self.budget().is_usable() {
            return Err(ConfigError::Invalid {
                field: "max_packet_size",
                reason: format!(
                    "{} is outside {}..={}",
                    self.max_packet_size,
                    FrameBudget::MIN_PACKET_SIZE,
                    MAX_PACKET_SIZE
                ),
            });
        }
        if self.rx_interfaces == 0 || self.rx_interfaces > MAX_RX_INTERFACES {
            return Err(ConfigError::Invalid {
                field: "rx_interfaces",
                reason: format!("{} is outside 1..={MAX_RX_INTERFACES}", self.rx_interfaces),
            });
        }

        if self.announce_interval_ms > self.rekey_interval_ms {
            warn!(
                rekey_ms = self.rekey_interval_ms,
                announce_ms = self.announce_interval_ms,
                "announce interval exceeds rekey interval; keys are never re-announced"
            );
        }
        Ok(())
    }

    /// Key schedule from the interval fields.
    pub fn schedule(&self) -> KeySchedule {
        KeySchedule {
            rekey_interval: Duration::from_millis(self.rekey_interval_ms),
            announce_interval: Duration::from_millis(self.announce_interval_ms),
        }
    }

    /// Frame budget from `max_packet_size`.
    pub fn budget(&self) -> FrameBudget {
        FrameBudget::new(self.max_packet_size)
    }

    /// Load the configured key file.
    pub fn load_keys(&self) -> Result<LinkKeys, ConfigError> {
        let path = self.key_file.as_ref().ok_or(ConfigError::Invalid {
            field: "key_file",
            reason: "not set".into(),
        })?;
        LinkKeys::load(path).map_err(|e| ConfigError::Invalid {
            field: "key_file",
            reason: e.to_string(),
        })
    }

    /// Transmitter configured from this file.
    pub fn transmitter(&self, keys: LinkKeys) -> Transmitter {
        Transmitter::from_key_manager(
            TxKeyManager::with_schedule(keys, self.schedule()),
            self.radio_port,
        )
        .with_mcs(self.mcs)
        .with_budget(self.budget())
    }

    /// Receiver configured from this file.
    pub fn receiver(&self, keys: LinkKeys) -> Receiver {
        Receiver::new(keys, self.radio_port)
    }
}
