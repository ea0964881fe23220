//! Publishing pipeline
//!
//! The Pipeline is responsible for:
//! - Resolving the IPv4 address, then the IPv6 address
//! - Publishing the retained discovery batch
//! - Publishing the state batch
//! - Producing the summary line for standard output
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐
//! │ AddressSource │   │ AddressSource │
//! │    (ipv4)     │   │    (ipv6)     │
//! └───────────────┘   └───────────────┘
//!         │                   │
//!         └─────────┬─────────┘
//!                   ▼
//!            ┌────────────┐
//!            │  Pipeline  │──── RunReport ───▶ summary line
//!            └────────────┘
//!                   │
//!         ┌─────────┴─────────┐
//!         ▼                   ▼
//! ┌───────────────┐   ┌───────────────┐
//! │   Publisher   │   │   Publisher   │
//! │  (discovery)  │   │    (state)    │
//! └───────────────┘   └───────────────┘
//! ```
//!
//! ## Failure handling
//!
//! Resolution errors propagate to the caller. Publish errors are logged
//! and recorded in the [`RunReport`], and never stop the next step.

use crate::config::PubIpConfig;
use crate::error::Result;
use crate::message::{BatchKind, PublishBatch, ResolvedAddresses};
use crate::traits::{AddressSource, Publisher};
use chrono::{DateTime, TimeZone};
use std::error::Error as StdError;
use tracing::{debug, error, info};

/// Outcome of one publish batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every message was handed to the broker
    Published,
    /// The batch failed; contains the full error chain
    Failed(String),
}

impl BatchOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, BatchOutcome::Published)
    }
}

/// Result of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The resolved addresses (published as state)
    pub addresses: ResolvedAddresses,
    /// Outcome of the discovery batch
    pub discovery: BatchOutcome,
    /// Outcome of the state batch
    pub state: BatchOutcome,
}

impl RunReport {
    /// Format the summary line: `yy/mm/dd;HH:MM;<ipv4>;<ipv6>`
    pub fn summary_line<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{};{};{};{}",
            now.format("%y/%m/%d"),
            now.format("%H:%M"),
            self.addresses.ipv4,
            self.addresses.ipv6
        )
    }
}

/// Sequential resolve-and-publish pipeline
///
/// ## Lifecycle
///
/// 1. Create with [`Pipeline::new()`]
/// 2. Call [`Pipeline::run()`] once
/// 3. Print [`RunReport::summary_line()`]
pub struct Pipeline {
    /// Source for the IPv4 address
    ipv4_source: Box<dyn AddressSource>,

    /// Source for the IPv6 address
    ipv6_source: Box<dyn AddressSource>,

    /// Publisher used for both batches
    publisher: Box<dyn Publisher>,

    /// Topics and sensor names
    config: PubIpConfig,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(
        ipv4_source: Box<dyn AddressSource>,
        ipv6_source: Box<dyn AddressSource>,
        publisher: Box<dyn Publisher>,
        config: PubIpConfig,
    ) -> Self {
        Self {
            ipv4_source,
            ipv6_source,
            publisher,
            config,
        }
    }

    /// Run the whole sequence once
    ///
    /// Only an address resolution error ends the run early; publish
    /// failures are reported through the returned [`RunReport`].
    pub async fn run(&self) -> Result<RunReport> {
        let addresses = self.resolve_addresses().await?;

        let discovery = self.publish_discovery().await;
        let state = self.publish_state(&addresses).await;

        info!(
            discovery = discovery.is_published(),
            state = state.is_published(),
            "Run complete"
        );

        Ok(RunReport {
            addresses,
            discovery,
            state,
        })
    }

    /// Resolve IPv4, then IPv6; never concurrently
    pub async fn resolve_addresses(&self) -> Result<ResolvedAddresses> {
        let ipv4 = self.resolve(self.ipv4_source.as_ref()).await?;
        let ipv6 = self.resolve(self.ipv6_source.as_ref()).await?;

        Ok(ResolvedAddresses { ipv4, ipv6 })
    }

    /// Publish the retained discovery batch
    pub async fn publish_discovery(&self) -> BatchOutcome {
        match PublishBatch::discovery(&self.config) {
            Ok(batch) => self.publish(batch).await,
            Err(e) => self.record_failure(BatchKind::Discovery, &e),
        }
    }

    /// Publish the state batch carrying the resolved addresses
    pub async fn publish_state(&self, addresses: &ResolvedAddresses) -> BatchOutcome {
        self.publish(PublishBatch::state(addresses, &self.config))
            .await
    }

    async fn resolve(&self, source: &dyn AddressSource) -> Result<String> {
        let family = source.family();
        debug!(%family, "Resolving public address");

        let address = source.resolve().await?;

        if address.is_empty() {
            info!(%family, "Resolver produced no output, publishing empty state");
        } else {
            info!(%family, %address, "Resolved public address");
        }

        Ok(address)
    }

    async fn publish(&self, batch: PublishBatch) -> BatchOutcome {
        debug!(
            kind = %batch.kind,
            messages = batch.len(),
            publisher = self.publisher.name(),
            "Publishing batch"
        );

        match self.publisher.publish_batch(&batch).await {
            Ok(()) => {
                info!(kind = %batch.kind, "Published {} message(s)", batch.len());
                BatchOutcome::Published
            }
            Err(e) => self.record_failure(batch.kind, &e),
        }
    }

    fn record_failure(&self, kind: BatchKind, err: &crate::Error) -> BatchOutcome {
        let detail = error_chain(err);
        error!(
            "Unable to publish {} messages via {}:\n{}",
            kind,
            self.publisher.name(),
            detail
        );
        BatchOutcome::Failed(detail)
    }
}

/// Render an error and all of its sources, one per line
fn error_chain(err: &dyn StdError) -> String {
    let mut out = format!("{}\n  debug: {:?}", err, err);
    let mut source = err.source();

    while let Some(cause) = source {
        out.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }

    out
}
