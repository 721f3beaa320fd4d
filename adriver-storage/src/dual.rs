//! Dual persistence adapter.
//!
//! One logical slot, two backends. Reads prefer the cookie and fall back to
//! local storage; they never merge. Writes go to both independently and a
//! failure on one side is reported, not rolled back or retried, so the two
//! sides can diverge until the next successful write.

use std::sync::Arc;

use adriver_core::{AdriverError, AdriverResult, ExpiryClock};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::traits::{Backend, CookieStore, LocalStore};

/// A backend operation that failed during a write or delete.
#[derive(Debug, Clone)]
pub struct BackendFailure {
    pub backend: Backend,
    pub error: AdriverError,
}

/// What a write or delete did.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// Guard tripped (blank key or value); no backend was touched.
    Skipped,
    /// Both backends were attempted. `failures` lists the ones that failed.
    Applied { failures: Vec<BackendFailure> },
}

impl WriteOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// True when both backends accepted the operation.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Applied { failures } if failures.is_empty())
    }

    pub fn failures(&self) -> &[BackendFailure] {
        match self {
            Self::Skipped => &[],
            Self::Applied { failures } => failures,
        }
    }
}

/// Cookie + local storage treated as one slot.
pub struct DualStorage<C, L>
where
    C: CookieStore,
    L: LocalStore,
{
    cookies: Arc<C>,
    local: Arc<L>,
}

impl<C, L> Clone for DualStorage<C, L>
where
    C: CookieStore,
    L: LocalStore,
{
    fn clone(&self) -> Self {
        Self {
            cookies: Arc::clone(&self.cookies),
            local: Arc::clone(&self.local),
        }
    }
}

impl<C, L> DualStorage<C, L>
where
    C: CookieStore,
    L: LocalStore,
{
    pub fn new(cookies: Arc<C>, local: Arc<L>) -> Self {
        Self { cookies, local }
    }

    pub fn cookies(&self) -> &C {
        &self.cookies
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    /// Read the slot: cookie first, then local storage.
    ///
    /// An empty string counts as no value. A backend error is logged and
    /// treated as absent for that backend.
    pub fn read(&self, key: &str) -> Option<String> {
        if let Some(value) = present(Backend::Cookie, key, self.cookies.get_cookie(key)) {
            return Some(value);
        }
        present(Backend::LocalStorage, key, self.local.get_item(key))
    }

    /// Write `value` to both backends.
    ///
    /// No-op when `key` or `value` is empty or absent. The cookie gets
    /// `expires_at`; local storage has no expiry.
    pub fn write(&self, key: &str, value: Option<&str>, expires_at: DateTime<Utc>) -> WriteOutcome {
        let value = match value {
            Some(v) if !key.is_empty() && !v.is_empty() => v,
            _ => {
                debug!(key, "skipping write of blank identifier");
                return WriteOutcome::Skipped;
            }
        };

        let mut failures = Vec::new();
        record(
            &mut failures,
            Backend::Cookie,
            key,
            self.cookies.set_cookie(key, value, expires_at),
        );
        record(
            &mut failures,
            Backend::LocalStorage,
            key,
            self.local.set_item(key, value),
        );
        WriteOutcome::Applied { failures }
    }

    /// Clear the slot in both backends.
    ///
    /// The cookie is overwritten with an empty value that has already expired;
    /// the local entry is removed outright.
    pub fn delete(&self, key: &str) -> WriteOutcome {
        let mut failures = Vec::new();
        record(
            &mut failures,
            Backend::Cookie,
            key,
            self.cookies.set_cookie(key, "", ExpiryClock::expired()),
        );
        record(
            &mut failures,
            Backend::LocalStorage,
            key,
            self.local.remove_item(key),
        );
        WriteOutcome::Applied { failures }
    }
}

fn present(backend: Backend, key: &str, result: AdriverResult<Option<String>>) -> Option<String> {
    match result {
        Ok(Some(value)) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(error) => {
            warn!(%backend, key, %error, "storage read failed, treating as absent");
            None
        }
    }
}

fn record(failures: &mut Vec<BackendFailure>, backend: Backend, key: &str, result: AdriverResult<()>) {
    if let Err(error) = result {
        warn!(%backend, key, %error, "storage write failed");
        failures.push(BackendFailure { backend, error });
    }
}
