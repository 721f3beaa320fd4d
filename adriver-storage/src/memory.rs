//! In-memory backends.
//!
//! Process-local stand-ins for browser storage. The cookie jar honours
//! expiry on read; the local store keeps values until removed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use adriver_core::{AdriverResult, StorageError};
use chrono::{DateTime, Utc};

use crate::traits::{http_date, CookieStore, LocalStore};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CookieEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CookieEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Cookie jar with native expiry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCookieJar {
    cookies: Arc<RwLock<HashMap<String, CookieEntry>>>,
}

impl InMemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiry recorded for a cookie, even if it has already lapsed.
    pub fn expires_at(&self, key: &str) -> AdriverResult<Option<DateTime<Utc>>> {
        let cookies = self.cookies.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(cookies.get(key).map(|entry| entry.expires_at))
    }

    /// `Set-Cookie` header value for a stored cookie.
    pub fn set_cookie_header(&self, key: &str) -> AdriverResult<Option<String>> {
        let cookies = self.cookies.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(cookies.get(key).map(|entry| {
            format!(
                "{}={}; expires={}; path=/; SameSite=Lax",
                key,
                entry.value,
                http_date(entry.expires_at)
            )
        }))
    }

    /// Number of cookies held, expired ones included.
    pub fn len(&self) -> usize {
        self.cookies.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for InMemoryCookieJar {
    fn get_cookie(&self, key: &str) -> AdriverResult<Option<String>> {
        let mut cookies = self.cookies.write().map_err(|_| StorageError::LockPoisoned)?;
        match cookies.get(key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                cookies.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set_cookie(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> AdriverResult<()> {
        let mut cookies = self.cookies.write().map_err(|_| StorageError::LockPoisoned)?;
        cookies.insert(
            key.to_string(),
            CookieEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// Plain key-value store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocalStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for InMemoryLocalStore {
    fn get_item(&self, key: &str) -> AdriverResult<Option<String>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AdriverResult<()> {
        let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AdriverResult<()> {
        let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
        items.remove(key);
        Ok(())
    }
}
