//! Sync orchestrator.
//!
//! Each sync reads the slot synchronously and dispatches a detached refresh.
//! The caller always gets the pre-refresh value; the refresh lands in storage
//! whenever the resolver answers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use adriver_core::{
    AdriverError, AdriverId, AdriverResult, ExpiryClock, IdResult, RefreshMode, ResolverError,
    SyncConfig,
};
use adriver_resolver::{IdentityResolver, Resolution};
use adriver_storage::{CookieStore, DualStorage, LocalStore, WriteOutcome};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a refresh task did once the resolver answered.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Resolver assigned an id; it was written to both backends.
    Stored { id: AdriverId, write: WriteOutcome },
    /// Resolver reported no id; the slot was cleared.
    Cleared { write: WriteOutcome },
    /// Resolver call failed; storage was left untouched.
    Failed(AdriverError),
}

/// Result of [`SyncOrchestrator::sync`].
#[derive(Debug)]
pub struct SyncTicket {
    /// Value read before the refresh was dispatched.
    pub result: IdResult,
    /// The dispatched refresh, or `None` when coalesced into one in flight.
    pub refresh: Option<JoinHandle<RefreshOutcome>>,
}

/// Clears the in-flight flag when the refresh task ends, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates the storage slot and the resolver.
pub struct SyncOrchestrator<C, L, R>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
    R: IdentityResolver + 'static,
{
    storage: DualStorage<C, L>,
    resolver: Arc<R>,
    key: String,
    expiry: ExpiryClock,
    mode: RefreshMode,
    in_flight: Arc<AtomicBool>,
    runtime: Handle,
}

impl<C, L, R> SyncOrchestrator<C, L, R>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
    R: IdentityResolver + 'static,
{
    /// Create an orchestrator that spawns refreshes on `runtime`.
    ///
    /// The expiry clock is built here, so under `ExpiryPolicy::FrozenAtLoad`
    /// every write made by this orchestrator carries the same expiry.
    pub fn new(
        config: &SyncConfig,
        storage: DualStorage<C, L>,
        resolver: Arc<R>,
        runtime: Handle,
    ) -> AdriverResult<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            resolver,
            key: config.storage_key.clone(),
            expiry: ExpiryClock::new(config.expiry_policy, config.retention),
            mode: config.refresh_mode,
            in_flight: Arc::new(AtomicBool::new(false)),
            runtime,
        })
    }

    /// Like [`new`](Self::new), using the runtime of the calling context.
    pub fn on_current_runtime(
        config: &SyncConfig,
        storage: DualStorage<C, L>,
        resolver: Arc<R>,
    ) -> AdriverResult<Self> {
        let runtime = Handle::try_current().map_err(|_| ResolverError::RuntimeUnavailable)?;
        Self::new(config, storage, resolver, runtime)
    }

    pub fn storage(&self) -> &DualStorage<C, L> {
        &self.storage
    }

    pub fn expiry(&self) -> &ExpiryClock {
        &self.expiry
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Current cached identifier. No I/O beyond the storage read.
    pub fn current(&self) -> IdResult {
        IdResult::from_stored(self.storage.read(&self.key))
    }

    /// Read the slot and dispatch a refresh without waiting for it.
    pub fn sync(&self) -> SyncTicket {
        let result = self.current();
        let refresh = self.dispatch();
        SyncTicket { result, refresh }
    }

    /// Spawn a refresh task, honouring the refresh mode.
    pub fn dispatch(&self) -> Option<JoinHandle<RefreshOutcome>> {
        let guard = match self.mode {
            RefreshMode::Independent => None,
            RefreshMode::Coalesce => {
                if self.in_flight.swap(true, Ordering::AcqRel) {
                    debug!(key = %self.key, "refresh already in flight, not dispatching");
                    return None;
                }
                Some(InFlightGuard(Arc::clone(&self.in_flight)))
            }
        };

        let storage = self.storage.clone();
        let resolver = Arc::clone(&self.resolver);
        let key = self.key.clone();
        let expiry = self.expiry;

        Some(self.runtime.spawn(async move {
            let _guard = guard;
            refresh(&storage, resolver.as_ref(), &key, &expiry).await
        }))
    }

    /// Run a refresh inline and wait for it.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        refresh(&self.storage, self.resolver.as_ref(), &self.key, &self.expiry).await
    }
}

async fn refresh<C, L, R>(
    storage: &DualStorage<C, L>,
    resolver: &R,
    key: &str,
    expiry: &ExpiryClock,
) -> RefreshOutcome
where
    C: CookieStore,
    L: LocalStore,
    R: IdentityResolver + ?Sized,
{
    match resolver.resolve().await {
        Ok(resolution) => apply(storage, key, expiry, resolution),
        Err(error) => {
            match &error {
                AdriverError::Resolver(ResolverError::InvalidResponse { .. }) => {
                    warn!(endpoint = resolver.endpoint(), %error, "discarding malformed resolver response");
                }
                _ => {
                    debug!(endpoint = resolver.endpoint(), %error, "identity resolution failed");
                }
            }
            RefreshOutcome::Failed(error)
        }
    }
}

fn apply<C, L>(
    storage: &DualStorage<C, L>,
    key: &str,
    expiry: &ExpiryClock,
    resolution: Resolution,
) -> RefreshOutcome
where
    C: CookieStore,
    L: LocalStore,
{
    match resolution {
        Resolution::Assigned(id) => {
            let write = storage.write(key, Some(id.as_str()), expiry.expires_at());
            info!(key, failures = write.failures().len(), "stored resolved identifier");
            RefreshOutcome::Stored { id, write }
        }
        Resolution::Unassigned => {
            let write = storage.delete(key);
            info!(key, failures = write.failures().len(), "resolver has no identifier, cleared slot");
            RefreshOutcome::Cleared { write }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adriver_core::{ExpiryPolicy, STORAGE_KEY};
    use adriver_storage::{InMemoryCookieJar, InMemoryLocalStore};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Resolver that waits for a permit, then answers with a fixed resolution.
    struct SignalResolver {
        answer: Resolution,
        gate: Semaphore,
        calls: AtomicUsize,
    }

    impl SignalResolver {
        fn new(answer: Resolution) -> Arc<Self> {
            Arc::new(Self {
                answer,
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IdentityResolver for SignalResolver {
        async fn resolve(&self) -> AdriverResult<Resolution> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            Ok(self.answer.clone())
        }

        fn endpoint(&self) -> &str {
            "test://signal"
        }
    }

    fn assigned(id: &str) -> Resolution {
        Resolution::Assigned(AdriverId::parse(Some(id)).expect("non-empty id"))
    }

    fn orchestrator(
        config: SyncConfig,
        resolver: Arc<SignalResolver>,
    ) -> SyncOrchestrator<InMemoryCookieJar, InMemoryLocalStore, SignalResolver> {
        let storage = DualStorage::new(
            Arc::new(InMemoryCookieJar::new()),
            Arc::new(InMemoryLocalStore::new()),
        );
        SyncOrchestrator::on_current_runtime(&config, storage, resolver)
            .expect("orchestrator should build")
    }

    #[tokio::test]
    async fn test_sync_returns_before_refresh_lands() {
        let resolver = SignalResolver::new(assigned("abc123"));
        let orch = orchestrator(SyncConfig::default(), resolver.clone());

        let ticket = orch.sync();
        assert!(ticket.result.is_empty());

        resolver.gate.add_permits(1);
        let outcome = ticket
            .refresh
            .expect("refresh dispatched")
            .await
            .expect("task should not panic");
        assert!(matches!(outcome, RefreshOutcome::Stored { .. }));
        assert_eq!(orch.current().adriver_id(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_coalesce_skips_second_dispatch() {
        let resolver = SignalResolver::new(assigned("abc123"));
        let config = SyncConfig::default().with_refresh_mode(RefreshMode::Coalesce);
        let orch = orchestrator(config, resolver.clone());

        let first = orch.sync();
        let second = orch.sync();
        assert!(first.refresh.is_some());
        assert!(second.refresh.is_none());
        assert!(orch.refresh_in_flight());

        resolver.gate.add_permits(1);
        first
            .refresh
            .expect("refresh dispatched")
            .await
            .expect("task should not panic");
        assert!(!orch.refresh_in_flight());

        // Guard released, next sync dispatches again
        let third = orch.sync();
        assert!(third.refresh.is_some());
        assert_eq!(third.result.adriver_id(), Some("abc123"));
        resolver.gate.add_permits(1);
    }

    #[tokio::test]
    async fn test_independent_dispatches_every_call() {
        let resolver = SignalResolver::new(Resolution::Unassigned);
        let orch = orchestrator(SyncConfig::default(), resolver.clone());

        let tickets: Vec<_> = (0..3).map(|_| orch.sync()).collect();
        assert!(tickets.iter().all(|t| t.refresh.is_some()));
        assert!(!orch.refresh_in_flight());

        for ticket in tickets {
            resolver.gate.add_permits(1);
            ticket
                .refresh
                .expect("refresh dispatched")
                .await
                .expect("task should not panic");
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_frozen_expiry_reused_across_writes() {
        let resolver = SignalResolver::new(assigned("abc123"));
        let config = SyncConfig::default().with_expiry_policy(ExpiryPolicy::FrozenAtLoad);
        let orch = orchestrator(config, resolver.clone());
        let frozen = orch.expiry().expires_at();

        for _ in 0..2 {
            resolver.gate.add_permits(1);
            orch.refresh_now().await;
            assert_eq!(
                orch.storage().cookies().expires_at(STORAGE_KEY).expect("lock ok"),
                Some(frozen)
            );
        }
    }

    #[test]
    fn test_requires_runtime() {
        let storage = DualStorage::new(
            Arc::new(InMemoryCookieJar::new()),
            Arc::new(InMemoryLocalStore::new()),
        );
        let result = SyncOrchestrator::on_current_runtime(
            &SyncConfig::default(),
            storage,
            SignalResolver::new(Resolution::Unassigned),
        );
        assert!(matches!(
            result,
            Err(AdriverError::Resolver(ResolverError::RuntimeUnavailable))
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        let storage = DualStorage::new(
            Arc::new(InMemoryCookieJar::new()),
            Arc::new(InMemoryLocalStore::new()),
        );
        let result = SyncOrchestrator::new(
            &SyncConfig::default().with_storage_key(""),
            storage,
            SignalResolver::new(Resolution::Unassigned),
            runtime.handle().clone(),
        );
        assert!(matches!(result, Err(AdriverError::Config(_))));
    }
}
