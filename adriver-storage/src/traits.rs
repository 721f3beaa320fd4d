//! Storage collaborator traits.
//!
//! These mirror the primitives a host environment exposes: a cookie store
//! that understands expiry, and a flat key-value store that does not.
//! Implementations must be thread-safe; refreshes write from spawned tasks.

use std::fmt;

use adriver_core::AdriverResult;
use chrono::{DateTime, Utc};

/// Which half of the dual slot an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Cookie,
    LocalStorage,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::LocalStorage => "local_storage",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cookie-like backend (backend A). Enforces expiry itself.
pub trait CookieStore: Send + Sync {
    /// Read a cookie. Expired cookies read as `None`.
    fn get_cookie(&self, key: &str) -> AdriverResult<Option<String>>;

    /// Set a cookie that expires at `expires_at`.
    ///
    /// Setting an expiry in the past is how a cookie is removed.
    fn set_cookie(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> AdriverResult<()>;
}

/// Local key-value backend (backend B). Has no notion of expiry.
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> AdriverResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> AdriverResult<()>;

    fn remove_item(&self, key: &str) -> AdriverResult<()>;
}

/// Render a timestamp as an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`),
/// the format cookie `expires` attributes use.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
