//! AdRiver ID Resolver - Remote Identity Resolution
//!
//! One GET to the resolution endpoint, credentials included, JSON back.
//! The wire is abstracted behind [`Transport`] so the host (or a test) can
//! supply its own; [`ReqwestTransport`] is the default.

use adriver_core::AdriverResult;
use async_trait::async_trait;

pub mod client;
pub mod transport;
pub mod types;

pub use client::ResolverClient;
pub use transport::{ReqwestTransport, ResolverRequest, Transport, TransportResponse};
pub use types::{Resolution, ResolverResponse};

/// Something that can tell us the user's current identifier.
///
/// Implementations must be thread-safe; the sync orchestrator calls
/// `resolve` from detached tasks.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Ask the remote service for the current identifier.
    ///
    /// # Returns
    /// * `Ok(Resolution::Assigned(_))` - The service knows this user
    /// * `Ok(Resolution::Unassigned)` - The service explicitly has no id
    /// * `Err(AdriverError::Resolver)` - Transport failure, non-2xx, or malformed body
    async fn resolve(&self) -> AdriverResult<Resolution>;

    /// The endpoint this resolver talks to, for logging.
    fn endpoint(&self) -> &str;
}
