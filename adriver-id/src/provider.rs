//! Provider contract.
//!
//! The interface an identity-orchestration host polls: a name, a vendor id,
//! `decode` for values the host already stored, and `get_id`.

use std::sync::Arc;

use adriver_core::{
    AdriverResult, ConsentData, IdResult, SubmoduleConfig, SyncConfig, GVLID, MODULE_NAME,
};
use adriver_resolver::{IdentityResolver, ReqwestTransport, ResolverClient};
use adriver_storage::{CookieStore, DualStorage, LocalStore};
use serde_json::Value;

use crate::registry::SubmoduleRegistry;
use crate::sync::SyncOrchestrator;

/// A user-id submodule as seen by the host.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait UserIdSubmodule: Send + Sync {
    /// Name used to link the submodule with host config.
    fn name(&self) -> &str;

    /// IAB global vendor list id, if the vendor has one.
    fn gvlid(&self) -> Option<u16> {
        None
    }

    /// Turn a value the host stored into what goes into bid requests.
    fn decode(&self, stored: Value) -> Value;

    /// Produce the current identifier. Must not block on I/O and must not fail.
    fn get_id(&self, config: &SubmoduleConfig, consent: Option<&ConsentData>) -> IdResult;
}

/// The AdRiver real-time user sync submodule.
pub struct AdriverIdSubmodule<C, L, R>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
    R: IdentityResolver + 'static,
{
    orchestrator: SyncOrchestrator<C, L, R>,
}

impl<C, L, R> AdriverIdSubmodule<C, L, R>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
    R: IdentityResolver + 'static,
{
    pub fn new(orchestrator: SyncOrchestrator<C, L, R>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator<C, L, R> {
        &self.orchestrator
    }

    /// Register with the host under the `userId` category.
    pub fn register(self, registry: &mut SubmoduleRegistry) -> AdriverResult<Arc<Self>> {
        let module = Arc::new(self);
        registry.submodule("userId", module.clone())?;
        Ok(module)
    }
}

impl<C, L> AdriverIdSubmodule<C, L, ResolverClient<ReqwestTransport>>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
{
    /// Wire the submodule to the real endpoint over reqwest, spawning
    /// refreshes on the current tokio runtime.
    pub fn with_http(config: &SyncConfig, cookies: Arc<C>, local: Arc<L>) -> AdriverResult<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let resolver = Arc::new(ResolverClient::new(transport, config.endpoint.clone()));
        let storage = DualStorage::new(cookies, local);
        let orchestrator = SyncOrchestrator::on_current_runtime(config, storage, resolver)?;
        Ok(Self::new(orchestrator))
    }
}

impl<C, L, R> UserIdSubmodule for AdriverIdSubmodule<C, L, R>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
    R: IdentityResolver + 'static,
{
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn gvlid(&self) -> Option<u16> {
        Some(GVLID)
    }

    /// The host has already normalized the stored value; pass it through.
    fn decode(&self, stored: Value) -> Value {
        stored
    }

    /// Return the cached id and kick off a background refresh.
    ///
    /// Consent is accepted but not consulted.
    fn get_id(&self, _config: &SubmoduleConfig, _consent: Option<&ConsentData>) -> IdResult {
        self.orchestrator.sync().result
    }
}

impl<C, L, R> std::fmt::Debug for AdriverIdSubmodule<C, L, R>
where
    C: CookieStore + 'static,
    L: LocalStore + 'static,
    R: IdentityResolver + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdriverIdSubmodule")
            .field("name", &MODULE_NAME)
            .field("gvlid", &GVLID)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adriver_core::AdriverId;
    use adriver_resolver::Resolution;
    use adriver_storage::{InMemoryCookieJar, InMemoryLocalStore};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;

    struct FixedResolver(Resolution);

    #[async_trait]
    impl IdentityResolver for FixedResolver {
        async fn resolve(&self) -> AdriverResult<Resolution> {
            Ok(self.0.clone())
        }

        fn endpoint(&self) -> &str {
            "test://fixed"
        }
    }

    type TestModule = AdriverIdSubmodule<InMemoryCookieJar, InMemoryLocalStore, FixedResolver>;

    fn module(runtime: &tokio::runtime::Runtime, answer: Resolution) -> TestModule {
        let storage = DualStorage::new(
            Arc::new(InMemoryCookieJar::new()),
            Arc::new(InMemoryLocalStore::new()),
        );
        let orchestrator = SyncOrchestrator::new(
            &SyncConfig::default(),
            storage,
            Arc::new(FixedResolver(answer)),
            runtime.handle().clone(),
        )
        .expect("orchestrator should build");
        AdriverIdSubmodule::new(orchestrator)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build")
    }

    #[test]
    fn test_identity() {
        let rt = runtime();
        let m = module(&rt, Resolution::Unassigned);
        assert_eq!(m.name(), "adriverId");
        assert_eq!(m.gvlid(), Some(375));
    }

    #[test]
    fn test_get_id_outside_runtime_context() {
        // Spawning goes through the stored handle, so the host may call
        // get_id from plain synchronous code.
        let rt = runtime();
        let m = module(
            &rt,
            Resolution::Assigned(AdriverId::parse(Some("xyz")).expect("non-empty")),
        );

        let first = m.get_id(&SubmoduleConfig::named("adriverId"), None);
        assert!(first.is_empty());

        // Drive the spawned refresh to completion
        rt.block_on(async {
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
        });

        let second = m.get_id(&SubmoduleConfig::named("adriverId"), None);
        assert_eq!(second.adriver_id(), Some("xyz"));
    }

    #[test]
    fn test_consent_is_ignored() {
        let rt = runtime();
        let m = module(&rt, Resolution::Unassigned);
        m.orchestrator()
            .storage()
            .local()
            .set_item("adriverId", "cached")
            .expect("set should succeed");

        let consent = ConsentData {
            gdpr_applies: Some(true),
            consent_string: None,
            api_version: Some(2),
        };
        let with = m.get_id(&SubmoduleConfig::default(), Some(&consent));
        let without = m.get_id(&SubmoduleConfig::default(), None);
        assert_eq!(with, without);
        assert_eq!(with.adriver_id(), Some("cached"));
    }

    #[test]
    fn test_decode_wire_value() {
        let rt = runtime();
        let m = module(&rt, Resolution::Unassigned);
        let stored = json!({ "adriverId": "abc123" });
        assert_eq!(m.decode(stored.clone()), stored);
    }

    fn json_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::hash_map("[a-z]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        /// Property: decode is the identity for any stored value.
        #[test]
        fn prop_decode_identity(value in json_strategy()) {
            let rt = runtime();
            let m = module(&rt, Resolution::Unassigned);
            prop_assert_eq!(m.decode(value.clone()), value);
        }
    }
}
