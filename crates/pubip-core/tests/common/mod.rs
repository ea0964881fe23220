//! Test doubles and common utilities for pipeline contract tests

use pubip_core::config::{AddressFamilyConfig, MqttConfig, PubIpConfig};
use pubip_core::error::{Error, Result};
use pubip_core::message::{AddressFamily, BatchKind, PublishBatch};
use pubip_core::traits::{AddressSource, Publisher};
use std::sync::{Arc, Mutex};

/// Shared, ordered log of everything the doubles were asked to do
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// An address source returning a fixed string
pub struct FixedAddressSource {
    family: AddressFamily,
    address: String,
    log: CallLog,
}

impl FixedAddressSource {
    pub fn new(family: AddressFamily, address: &str, log: CallLog) -> Self {
        Self {
            family,
            address: address.to_string(),
            log,
        }
    }
}

#[async_trait::async_trait]
impl AddressSource for FixedAddressSource {
    async fn resolve(&self) -> Result<String> {
        self.log.lock().unwrap().push(format!("resolve {}", self.family));
        Ok(self.address.clone())
    }

    fn family(&self) -> AddressFamily {
        self.family
    }
}

/// An address source whose resolver cannot be started
pub struct BrokenAddressSource {
    family: AddressFamily,
}

impl BrokenAddressSource {
    pub fn new(family: AddressFamily) -> Self {
        Self { family }
    }
}

#[async_trait::async_trait]
impl AddressSource for BrokenAddressSource {
    async fn resolve(&self) -> Result<String> {
        Err(Error::address_source("failed to spawn resolver"))
    }

    fn family(&self) -> AddressFamily {
        self.family
    }
}

/// A publisher that records every batch and fails the configured kinds
pub struct RecordingPublisher {
    batches: Arc<Mutex<Vec<PublishBatch>>>,
    failing: Vec<BatchKind>,
    log: CallLog,
}

impl RecordingPublisher {
    pub fn new(log: CallLog) -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
            failing: Vec::new(),
            log,
        }
    }

    /// Make every batch of this kind fail after being recorded
    pub fn failing_on(mut self, kind: BatchKind) -> Self {
        self.failing.push(kind);
        self
    }

    /// Handle for inspecting batches after the publisher is moved
    pub fn batches(&self) -> Arc<Mutex<Vec<PublishBatch>>> {
        self.batches.clone()
    }
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_batch(&self, batch: &PublishBatch) -> Result<()> {
        self.log.lock().unwrap().push(format!("publish {}", batch.kind));
        self.batches.lock().unwrap().push(batch.clone());

        if self.failing.contains(&batch.kind) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Minimal valid configuration
pub fn test_config() -> PubIpConfig {
    let family = |v: &str| AddressFamilyConfig {
        discovery_topic: format!("homeassistant/sensor/public_{v}/config"),
        discovery_name: format!("Public {v}"),
        state_topic: format!("home/public_ip/{v}"),
        shell: "true".to_string(),
    };

    PubIpConfig {
        mqtt: MqttConfig {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "pubip-test".to_string(),
            user: "user".to_string(),
            password: "pw".to_string(),
        },
        ipv4: family("ipv4"),
        ipv6: family("ipv6"),
    }
}
