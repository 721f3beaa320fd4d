//! AdRiver ID - Real Time User Sync submodule
//!
//! Resolves a persistent pseudonymous identifier for the current user. Each
//! `get_id` returns whatever is cached in the cookie/local-storage slot and
//! dispatches a background call to the AdRiver resolver, which refreshes or
//! purges the slot when it answers.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = SubmoduleRegistry::new();
//! let module = AdriverIdSubmodule::with_http(
//!     &SyncConfig::from_env(),
//!     Arc::new(InMemoryCookieJar::new()),
//!     Arc::new(LmdbLocalStore::open("/var/lib/adriver", 16)?),
//! )?
//! .register(&mut registry)?;
//!
//! let ids = registry.request_ids(&[SubmoduleConfig::named("adriverId")], None);
//! ```

pub mod provider;
pub mod registry;
pub mod sync;

pub use provider::{AdriverIdSubmodule, UserIdSubmodule};
pub use registry::SubmoduleRegistry;
pub use sync::{RefreshOutcome, SyncOrchestrator, SyncTicket};

// Re-export the types hosts need to drive the module
pub use adriver_core::{
    AdriverError, AdriverId, AdriverResult, ConsentData, DecodedId, ExpiryPolicy, IdResult,
    RefreshMode, SubmoduleConfig, SyncConfig, GVLID, MODULE_NAME,
};
pub use adriver_resolver::{IdentityResolver, ReqwestTransport, ResolverClient, Transport};
pub use adriver_storage::{
    CookieStore, DualStorage, InMemoryCookieJar, InMemoryLocalStore, LmdbLocalStore, LocalStore,
};
