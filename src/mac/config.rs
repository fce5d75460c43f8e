use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fmt::{Debug, Display},
};

use super::rate::RateManagerKind;
use crate::{
    phy::{Standard, WifiMode},
    time::Duration,
};

/// The configuration shared by all MACs of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacConfig {
    pub standard: Standard,
    pub channel: u32,
    pub tx_power_dbm: f64,
    /// Frames of at least this size (FCS included) use RTS/CTS.
    pub rts_cts_threshold: u32,
    pub max_retransmissions: u32,
    /// In seconds, zero disables the timeout.
    pub max_time_in_queue: f64,
    /// Zero allows an unbounded queue.
    pub max_queue_length: usize,
    /// `arf` or `ideal`.
    pub rate_manager: String,
    /// The name of the mode used for broadcast data.
    pub broadcast_mode: Option<String>,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            standard: Standard::G,
            channel: 1,
            tx_power_dbm: 16.0206,
            rts_cts_threshold: 2200,
            max_retransmissions: 7,
            max_time_in_queue: 10.0,
            max_queue_length: 400,
            rate_manager: RateManagerKind::Arf.to_string(),
            broadcast_mode: None,
        }
    }
}

impl MacConfig {
    /// Checks every field that cannot be validated by the type system.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_manager_kind()?;
        self.broadcast_data_mode()?;
        self.queue_timeout()?;
        if !self.standard.is_valid_channel(self.channel) {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidChannel,
                format!("channel {} is not allowed in {}", self.channel, self.standard),
            ));
        }
        Ok(())
    }

    /// The configured rate adaptation algorithm.
    ///
    /// # Errors
    ///
    /// Fails for unset or unknown algorithm names.
    pub fn rate_manager_kind(&self) -> Result<RateManagerKind, ConfigError> {
        match self.rate_manager.to_ascii_lowercase().as_str() {
            "arf" => Ok(RateManagerKind::Arf),
            "ideal" => Ok(RateManagerKind::Ideal),
            "" => Err(ConfigError::new(
                ConfigErrorKind::UnknownRateManager,
                "the rate manager is not set",
            )),
            other => Err(ConfigError::new(
                ConfigErrorKind::UnknownRateManager,
                format!("unknown rate manager '{other}', expected 'arf' or 'ideal'"),
            )),
        }
    }

    /// The broadcast mode override, if any.
    ///
    /// # Errors
    ///
    /// Fails if the mode is unknown or not supported by the standard.
    pub fn broadcast_data_mode(&self) -> Result<Option<WifiMode>, ConfigError> {
        let Some(name) = &self.broadcast_mode else {
            return Ok(None);
        };
        match WifiMode::by_name(name) {
            Some(mode) if self.standard.modes().contains(&mode) => Ok(Some(mode)),
            Some(mode) => Err(ConfigError::new(
                ConfigErrorKind::UnsupportedMode,
                format!("{mode} is not supported by {}", self.standard),
            )),
            None => Err(ConfigError::new(
                ConfigErrorKind::UnsupportedMode,
                format!("unknown mode '{name}'"),
            )),
        }
    }

    /// The queue timeout as duration.
    ///
    /// # Errors
    ///
    /// Fails for negative or non-finite values.
    pub fn queue_timeout(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.max_time_in_queue).map_err(|e| {
            ConfigError::new(
                ConfigErrorKind::Parse,
                format!("invalid max_time_in_queue {}: {e}", self.max_time_in_queue),
            )
        })
    }
}

/// An invalid scenario or MAC configuration.
pub struct ConfigError {
    kind: ConfigErrorKind,
    internal: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, internal: impl Into<String>) -> Self {
        Self {
            kind,
            internal: internal.into(),
        }
    }

    /// Returns the kind of the error.
    #[must_use]
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.internal, self.kind)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.internal, self.kind)
    }
}

impl Error for ConfigError {}

impl From<serde_yml::Error> for ConfigError {
    fn from(value: serde_yml::Error) -> Self {
        Self::new(ConfigErrorKind::Parse, value.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::new(ConfigErrorKind::Io, value.to_string())
    }
}

/// The kinds of configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigErrorKind {
    /// The input is no valid YAML or has the wrong shape.
    Parse,
    /// The rate manager is unset or unknown.
    UnknownRateManager,
    /// The channel does not exist in the standard.
    InvalidChannel,
    /// A mode is unknown or not part of the standard.
    UnsupportedMode,
    /// Two nodes share an address.
    DuplicateNode,
    /// Traffic refers to an address without a node.
    UnknownNode,
    /// The configuration file could not be read.
    Io,
}

impl Display for ConfigErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MacConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_manager_kind().unwrap(), RateManagerKind::Arf);
        assert_eq!(config.queue_timeout().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn partial_yaml() {
        let config: MacConfig =
            serde_yml::from_str("standard: a\nchannel: 36\nrate_manager: IDEAL\n").unwrap();
        assert_eq!(config.standard, Standard::A);
        assert_eq!(config.max_retransmissions, 7);
        assert_eq!(config.rate_manager_kind().unwrap(), RateManagerKind::Ideal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_fields() {
        let config = MacConfig {
            rate_manager: String::new(),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ConfigErrorKind::UnknownRateManager
        );

        let config = MacConfig {
            channel: 36,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ConfigErrorKind::InvalidChannel
        );

        let config = MacConfig {
            broadcast_mode: Some("OfdmRate6Mbps".into()),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ConfigErrorKind::UnsupportedMode
        );

        let err = serde_yml::from_str::<MacConfig>("channel: [1]").map(|_| ()).unwrap_err();
        assert_eq!(ConfigError::from(err).kind(), ConfigErrorKind::Parse);
    }
}
