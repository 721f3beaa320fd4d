//! AdRiver ID Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Scripted transport for driving the resolver without a network
//! - Storage backends that fail on demand
//! - Proptest generators for identifiers and resolver bodies
//! - Fixtures for common slot states

pub use adriver_core::{
    AdriverError, AdriverId, AdriverResult, ResolverError, StorageError, SyncConfig,
    RESOLVER_ENDPOINT, STORAGE_KEY,
};
pub use adriver_resolver::{ResolverClient, ResolverRequest, Transport, TransportResponse};
pub use adriver_storage::{
    CookieStore, DualStorage, InMemoryCookieJar, InMemoryLocalStore, LocalStore,
};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proptest::prelude::*;
use tokio::sync::Semaphore;

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// Transport that replays queued replies and records every request.
///
/// When the queue is empty the fallback reply is used. A held transport
/// parks each request until [`release`](Self::release) hands out a permit.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<AdriverResult<TransportResponse>>>,
    fallback: AdriverResult<TransportResponse>,
    requests: Mutex<Vec<ResolverRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedTransport {
    /// Every request answers with `body` and status 200.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_fallback(Ok(TransportResponse::ok(body)))
    }

    pub fn with_fallback(fallback: AdriverResult<TransportResponse>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Park requests until released.
    pub fn held(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Queue a reply ahead of the fallback.
    pub fn push_reply(&self, reply: AdriverResult<TransportResponse>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn push_body(&self, body: impl Into<String>) {
        self.push_reply(Ok(TransportResponse::ok(body)));
    }

    /// Let `n` parked requests proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn requests(&self) -> Vec<ResolverRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ResolverRequest) -> AdriverResult<TransportResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let queued = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Reply with a non-2xx status.
pub fn status_reply(status: u16) -> AdriverResult<TransportResponse> {
    Ok(TransportResponse {
        status,
        body: String::new(),
    })
}

/// Reply as if the connection failed.
pub fn network_error() -> AdriverResult<TransportResponse> {
    Err(ResolverError::RequestFailed {
        endpoint: RESOLVER_ENDPOINT.to_string(),
        status: 0,
        message: "connection reset".to_string(),
    }
    .into())
}

// ============================================================================
// FAILING BACKENDS
// ============================================================================

fn injected(backend: &str, key: &str) -> AdriverError {
    StorageError::WriteFailed {
        backend: backend.to_string(),
        key: key.to_string(),
        reason: "injected failure".to_string(),
    }
    .into()
}

/// In-memory cookie jar whose writes can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyCookieJar {
    inner: InMemoryCookieJar,
    fail_writes: AtomicBool,
}

impl FlakyCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryCookieJar {
        &self.inner
    }
}

impl CookieStore for FlakyCookieJar {
    fn get_cookie(&self, key: &str) -> AdriverResult<Option<String>> {
        self.inner.get_cookie(key)
    }

    fn set_cookie(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> AdriverResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("cookie", key));
        }
        self.inner.set_cookie(key, value, expires_at)
    }
}

/// In-memory local store whose writes and removals can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyLocalStore {
    inner: InMemoryLocalStore,
    fail_writes: AtomicBool,
}

impl FlakyLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl LocalStore for FlakyLocalStore {
    fn get_item(&self, key: &str) -> AdriverResult<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> AdriverResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("local_storage", key));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> AdriverResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("local_storage", key));
        }
        self.inner.remove_item(key)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Resolver body assigning `id`.
pub fn assigned_body(id: &str) -> String {
    serde_json::json!({ "adriverid": id }).to_string()
}

/// Resolver body with no identifier.
pub const EMPTY_BODY: &str = "{}";

// ============================================================================
// GENERATORS
// ============================================================================

/// Identifiers shaped like the ones the resolver hands out.
pub fn adriver_id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,64}"
}

/// Resolver bodies that carry no usable identifier.
pub fn unassigned_body_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("{}".to_string()),
        Just(r#"{"adriverid":null}"#.to_string()),
        Just(r#"{"adriverid":""}"#.to_string()),
        Just(r#"{"adriverid":false}"#.to_string()),
        Just(r#"{"adriverid":0}"#.to_string()),
        Just("[]".to_string()),
        "[a-z]{1,8}".prop_map(|field| serde_json::json!({ field: 1 }).to_string()),
    ]
}

/// Bodies the resolver client rejects: not JSON, not an object, or an
/// `adriverid` that is an array or object.
pub fn malformed_body_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("null".to_string()),
        Just("<html>502 Bad Gateway</html>".to_string()),
        Just(r#"{"adriverid":[1]}"#.to_string()),
        Just(r#"{"adriverid":{"id":"x"}}"#.to_string()),
        "\\{[a-z]{0,8}",
    ]
}
