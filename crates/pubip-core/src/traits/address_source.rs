// # Address Source Trait
//
// Defines the interface for resolving a host's public address.
//
// ## Implementations
//
// - Shell command: `pubip-ip-shell` crate
//
// ## Usage
//
// ```rust,ignore
// use pubip_core::AddressSource;
//
// async fn show(source: &dyn AddressSource) -> pubip_core::Result<()> {
//     let address = source.resolve().await?;
//     println!("{}: {}", source.family(), address);
//     Ok(())
// }
// ```

use crate::message::AddressFamily;
use async_trait::async_trait;

/// Trait for address source implementations
///
/// A source is asked exactly once per run. Whatever text it produces is
/// the result: no format validation and no retry happens at this level
/// or above.
///
/// # Errors
///
/// Only failures that leave no usable text at all (the resolver could not
/// be started, its output could not be decoded) are errors. A slow or
/// failing resolver that still printed something, or printed nothing,
/// yields `Ok`.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Resolve the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The trimmed address text (possibly empty)
    /// - `Err(Error)`: If the resolver could not run at all
    async fn resolve(&self) -> Result<String, crate::Error>;

    /// Get the address family this source resolves
    fn family(&self) -> AddressFamily;
}
