//! Message model
//!
//! Every run produces two batches: a retained discovery batch that lets a
//! home-automation platform register one sensor per address family, and a
//! non-retained state batch carrying the resolved addresses.

use crate::config::PubIpConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IP address family (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Both families in publish order
    pub const ALL: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

    /// Name of the configuration section for this family
    pub fn section_name(self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section_name())
    }
}

/// The two resolved addresses of one run
///
/// Values are the trimmed output of the configured commands and are not
/// validated; either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddresses {
    pub ipv4: String,
    pub ipv6: String,
}

impl ResolvedAddresses {
    pub fn new(ipv4: impl Into<String>, ipv6: impl Into<String>) -> Self {
        Self {
            ipv4: ipv4.into(),
            ipv6: ipv6.into(),
        }
    }

    /// Get the address for one family
    pub fn get(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.ipv4,
            AddressFamily::V6 => &self.ipv6,
        }
    }
}

/// Discovery payload announcing a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    pub name: String,
    pub state_topic: String,
}

impl DiscoveryMessage {
    pub fn new(name: impl Into<String>, state_topic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state_topic: state_topic.into(),
        }
    }

    /// Encode as a JSON object with exactly `name` and `state_topic`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// MQTT delivery guarantee
///
/// Only "at most once" is used; the broker neither acknowledges nor
/// redelivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    #[default]
    AtMostOnce,
}

/// A single message ready to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic
    pub topic: String,
    /// UTF-8 payload
    pub payload: String,
    /// Delivery guarantee
    pub qos: QoS,
    /// Whether the broker keeps this as the topic's last value
    pub retain: bool,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain,
        }
    }
}

/// Which batch a set of messages belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Discovery,
    State,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Discovery => f.write_str("discovery"),
            BatchKind::State => f.write_str("state"),
        }
    }
}

/// An ordered list of messages sent over one broker connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishBatch {
    pub kind: BatchKind,
    pub messages: Vec<OutboundMessage>,
}

impl PublishBatch {
    /// Build the retained discovery batch (IPv4 first, then IPv6)
    ///
    /// The payloads depend only on the configuration, never on the
    /// resolved addresses.
    pub fn discovery(config: &PubIpConfig) -> Result<Self> {
        let messages = AddressFamily::ALL
            .iter()
            .map(|family| {
                let section = config.family(*family);
                let payload =
                    DiscoveryMessage::new(&section.discovery_name, &section.state_topic)
                        .to_json()?;
                Ok(OutboundMessage::new(&section.discovery_topic, payload, true))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind: BatchKind::Discovery,
            messages,
        })
    }

    /// Build the non-retained state batch (IPv4 first, then IPv6)
    pub fn state(addresses: &ResolvedAddresses, config: &PubIpConfig) -> Self {
        let messages = AddressFamily::ALL
            .iter()
            .map(|family| {
                OutboundMessage::new(
                    &config.family(*family).state_topic,
                    addresses.get(*family),
                    false,
                )
            })
            .collect();

        Self {
            kind: BatchKind::State,
            messages,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
