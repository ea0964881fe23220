// # pubip-core
//
// Core library for publishing a host's public IP addresses over MQTT.
//
// ## Architecture Overview
//
// This library provides everything except the concrete I/O adapters:
// - **PubIpConfig**: INI-backed configuration (broker plus one section per address family)
// - **AddressSource**: Trait for resolving one address family to a string
// - **Publisher**: Trait for delivering one batch of messages to a broker
// - **Pipeline**: Orchestrates resolve → publish discovery → publish state
// - **PublishBatch**: The discovery and state message batches
//
// ## Design Principles
//
// 1. **Sequential**: One family at a time, one batch at a time
// 2. **Isolated failures**: A failed batch never prevents the next one
// 3. **Library-First**: The binary is a thin wrapper around `Pipeline`
// 4. **No state**: Nothing survives a single invocation

pub mod config;
pub mod engine;
pub mod error;
pub mod message;
pub mod traits;

// Re-export core types for convenience
pub use config::{AddressFamilyConfig, MqttConfig, PubIpConfig};
pub use engine::{BatchOutcome, Pipeline, RunReport};
pub use error::{ConfigError, Error, Result};
pub use message::{
    AddressFamily, BatchKind, DiscoveryMessage, OutboundMessage, PublishBatch, QoS,
    ResolvedAddresses,
};
pub use traits::{AddressSource, Publisher};
