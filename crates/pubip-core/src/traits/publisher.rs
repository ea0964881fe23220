// # Publisher Trait
//
// Defines the interface for delivering message batches to a broker.
//
// ## Implementations
//
// - MQTT: `pubip-publisher-mqtt` crate

use crate::message::PublishBatch;
use async_trait::async_trait;

/// Trait for publisher implementations
///
/// Each call to [`Publisher::publish_batch`] is a complete session:
/// connect, publish every message in order, disconnect. Nothing is kept
/// between calls, so a failed batch leaves no state that could affect the
/// next one.
///
/// Implementations must not retry; the caller decides what a failure
/// means.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish all messages of the batch over one fresh connection
    async fn publish_batch(&self, batch: &PublishBatch) -> Result<(), crate::Error>;

    /// Get the publisher name (for logging)
    fn name(&self) -> &'static str;
}
