//! AdRiver ID Storage - Dual Persistence
//!
//! The identifier lives in one logical slot replicated across two backends:
//! a cookie store (expires natively) and a local key-value store (no expiry).
//! [`DualStorage`] treats the pair as a single slot with "first available
//! wins" reads and independent, unreconciled writes.

pub mod dual;
pub mod lmdb;
pub mod memory;
pub mod traits;

pub use dual::{BackendFailure, DualStorage, WriteOutcome};
pub use lmdb::{LmdbLocalStore, LmdbStoreError};
pub use memory::{InMemoryCookieJar, InMemoryLocalStore};
pub use traits::{http_date, Backend, CookieStore, LocalStore};
