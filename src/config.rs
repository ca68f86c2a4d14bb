//! TOML-backed connection profiles.
//!
//! Lets applications keep their serial connection shapes in a config file
//! instead of hard-coding them:
//!
//! ```toml
//! [defaults]
//! baud_rate = 115200
//!
//! [profiles.scanner]
//! port_name = "/dev/ttyUSB0"
//! parity = "even"
//!
//! [profiles.controller]
//! port_name = "COM7"
//! baud_rate = 9600
//! ```
//!
//! A profile resolves into a [`ConnectionInfo`], filling its baud rate from
//! `[defaults]` when unset.

use crate::connection::ConnectionInfo;
use crate::constants::DEFAULT_BAUD_RATE;
use crate::transport::{DataBits, FlowControl, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found at the given path.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the config file.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Fallbacks applied to profiles that leave fields unset.
    pub defaults: LinkDefaults,
    /// Named connection profiles.
    pub profiles: HashMap<String, ConnectionProfile>,
}

/// Defaults section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkDefaults {
    /// Baud rate used by profiles that do not set one.
    pub baud_rate: u32,
}

impl Default for LinkDefaults {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// One named connection shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// The port this profile connects to.
    pub port_name: String,
    /// Baud rate; falls back to `[defaults]` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_bits: Option<DataBits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_bits: Option<StopBits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<Parity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<FlowControl>,
}

impl LinkConfig {
    /// Load a config from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse a config from a TOML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve a named profile into a [`ConnectionInfo`].
    ///
    /// Returns `None` when no profile has that name.
    pub fn connection_info(&self, profile_name: &str) -> Option<ConnectionInfo> {
        let profile = self.profiles.get(profile_name)?;
        Some(ConnectionInfo {
            port_name: profile.port_name.clone(),
            baud_rate: profile.baud_rate.unwrap_or(self.defaults.baud_rate),
            data_bits: profile.data_bits,
            stop_bits: profile.stop_bits,
            parity: profile.parity,
            flow_control: profile.flow_control,
        })
    }

    /// Names of all configured profiles.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
        [defaults]
        baud_rate = 115200

        [profiles.scanner]
        port_name = "/dev/ttyUSB0"
        parity = "even"

        [profiles.controller]
        port_name = "COM7"
        baud_rate = 9600
        data_bits = "eight"
    "#;

    #[test]
    fn parses_profiles_and_defaults() {
        let config = LinkConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.defaults.baud_rate, 115_200);
        assert_eq!(config.profiles.len(), 2);
    }

    #[test]
    fn profile_resolves_with_default_baud_rate() {
        let config = LinkConfig::parse(SAMPLE).unwrap();

        let info = config.connection_info("scanner").unwrap();

        assert_eq!(info.port_name, "/dev/ttyUSB0");
        assert_eq!(info.baud_rate, 115_200);
        assert_eq!(info.parity, Some(Parity::Even));
        assert_eq!(info.data_bits, None);
    }

    #[test]
    fn profile_baud_rate_overrides_the_default() {
        let config = LinkConfig::parse(SAMPLE).unwrap();

        let info = config.connection_info("controller").unwrap();

        assert_eq!(info.baud_rate, 9600);
        assert_eq!(info.data_bits, Some(DataBits::Eight));
    }

    #[test]
    fn unknown_profile_resolves_to_none() {
        let config = LinkConfig::parse(SAMPLE).unwrap();
        assert!(config.connection_info("printer").is_none());
    }

    #[test]
    fn empty_config_uses_built_in_defaults() {
        let config = LinkConfig::parse("").unwrap();
        assert_eq!(config.defaults.baud_rate, DEFAULT_BAUD_RATE);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let result = LinkConfig::parse("profiles = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_from_missing_file_reports_not_found() {
        let result = LinkConfig::load_from("/nonexistent/serial-link.toml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_from_reads_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = LinkConfig::load_from(&path).unwrap();

        assert!(config.connection_info("controller").is_some());
    }
}
