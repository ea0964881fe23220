//! Configuration types for pubip
//!
//! The configuration is an INI file with three required sections:
//!
//! ```ini
//! [mqtt]
//! host = broker.local
//! port = 1883
//! client_id = pubip
//! user = pubip
//! pw = secret
//!
//! [ipv4]
//! discovery_topic = homeassistant/sensor/public_ipv4/config
//! discovery_name = Public IPv4
//! state_topic = home/public_ip/v4
//! shell = dig +short myip.opendns.com @resolver1.opendns.com
//!
//! [ipv6]
//! discovery_topic = homeassistant/sensor/public_ipv6/config
//! discovery_name = Public IPv6
//! state_topic = home/public_ip/v6
//! shell = dig +short -6 myip.opendns.com aaaa @resolver1.ipv6-sandbox.opendns.com
//! ```

use crate::error::ConfigError;
use crate::message::AddressFamily;
use ini::{Ini, ParseOption};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::Level;

/// Section holding the broker connection settings
pub const MQTT_SECTION: &str = "mqtt";

/// Required keys of the `mqtt` section, in check order
pub const MQTT_PARAMETERS: &[&str] = &["host", "port", "client_id", "user", "pw"];

/// Required keys of the `ipv4` and `ipv6` sections, in check order
pub const FAMILY_PARAMETERS: &[&str] = &["discovery_topic", "discovery_name", "state_topic", "shell"];

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "PUBIP_LOG_LEVEL";

/// Main configuration, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubIpConfig {
    /// Broker settings
    pub mqtt: MqttConfig,

    /// IPv4 sensor settings
    pub ipv4: AddressFamilyConfig,

    /// IPv6 sensor settings
    pub ipv6: AddressFamilyConfig,
}

impl PubIpConfig {
    /// Load the configuration from an INI file
    ///
    /// Fails on the first problem found: unreadable file, invalid INI,
    /// a missing key (sections `mqtt`, `ipv4`, `ipv6` in that order), or
    /// a port that is not an integer.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound { path: display.clone() })?;

        Self::parse(&text, &display)
    }

    /// Parse configuration from INI text
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<string>")
    }

    /// Get the settings for one address family
    pub fn family(&self, family: AddressFamily) -> &AddressFamilyConfig {
        match family {
            AddressFamily::V4 => &self.ipv4,
            AddressFamily::V6 => &self.ipv6,
        }
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        // Shell commands are taken literally: no unquoting, no escapes.
        // Indented lines continue the previous value.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            enabled_indented_mutiline_value: true,
            ..ParseOption::default()
        };

        let ini = Ini::load_from_str_opt(text, options).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        let mqtt = Section::read(&ini, MQTT_SECTION, MQTT_PARAMETERS)?;
        let ipv4 = Section::read(&ini, AddressFamily::V4.section_name(), FAMILY_PARAMETERS)?;
        let ipv6 = Section::read(&ini, AddressFamily::V6.section_name(), FAMILY_PARAMETERS)?;

        let raw_port = mqtt.get("port");
        let port = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort {
                value: raw_port.to_string(),
            })?;

        Ok(Self {
            mqtt: MqttConfig {
                host: mqtt.get("host").to_string(),
                port,
                client_id: mqtt.get("client_id").to_string(),
                user: mqtt.get("user").to_string(),
                password: mqtt.get("pw").to_string(),
            },
            ipv4: AddressFamilyConfig::from_section(&ipv4),
            ipv6: AddressFamilyConfig::from_section(&ipv6),
        })
    }
}

/// Broker connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker TCP port
    pub port: u16,

    /// MQTT client identifier
    pub client_id: String,

    /// Username for broker authentication
    pub user: String,

    /// Password for broker authentication (`pw` in the INI file)
    pub password: String,
}

// The password never appears in logs
impl fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sensor settings for one address family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFamilyConfig {
    /// Topic receiving the retained discovery message
    pub discovery_topic: String,

    /// Sensor name announced in the discovery message
    pub discovery_name: String,

    /// Topic receiving the resolved address
    pub state_topic: String,

    /// Shell command printing the public address on stdout
    pub shell: String,
}

impl AddressFamilyConfig {
    fn from_section(section: &Section) -> Self {
        Self {
            discovery_topic: section.get("discovery_topic").to_string(),
            discovery_name: section.get("discovery_name").to_string(),
            state_topic: section.get("state_topic").to_string(),
            shell: section.get("shell").to_string(),
        }
    }
}

/// A section whose required keys are known to be present
///
/// Key names are matched case-insensitively, so `PW = secret` satisfies `pw`.
struct Section {
    values: HashMap<String, String>,
}

impl Section {
    fn read(ini: &Ini, name: &str, required: &[&str]) -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = ini
            .section(Some(name))
            .map(|properties| {
                properties
                    .iter()
                    .map(|(key, value)| (key.to_lowercase(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        for parameter in required {
            let present = values
                .get(*parameter)
                .is_some_and(|v| !v.trim().is_empty());

            if !present {
                return Err(ConfigError::MissingParameter {
                    section: name.to_string(),
                    parameter: parameter.to_string(),
                });
            }
        }

        Ok(Self { values })
    }

    fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or_default()
    }
}

/// Parse a log level name, defaulting to `warn` when unset
pub fn parse_log_level(value: Option<&str>) -> Result<Level, ConfigError> {
    let Some(value) = value else {
        return Ok(Level::WARN);
    };

    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel {
            value: value.to_string(),
        }),
    }
}
