//! Core traits for pubip
//!
//! - [`AddressSource`]: Resolve the public address of one family
//! - [`Publisher`]: Deliver a batch of messages to the broker

pub mod address_source;
pub mod publisher;

pub use address_source::AddressSource;
pub use publisher::Publisher;
