//! Host-side submodule registry.
//!
//! The boundary the host exposes for `submodule(category, provider)`.
//! Providers must be explicitly registered - no auto-discovery.

use std::sync::Arc;

use adriver_core::{AdriverResult, ConsentData, IdResult, ModuleCategory, SubmoduleConfig};
use tracing::debug;

use crate::provider::UserIdSubmodule;

/// Registry of user-id submodules, keyed by name.
#[derive(Default)]
pub struct SubmoduleRegistry {
    user_id: Vec<Arc<dyn UserIdSubmodule>>,
}

impl SubmoduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `category`.
    ///
    /// Only `"userId"` is known. A provider with the same name as an existing
    /// one replaces it.
    pub fn submodule(
        &mut self,
        category: &str,
        provider: Arc<dyn UserIdSubmodule>,
    ) -> AdriverResult<()> {
        match ModuleCategory::from_name(category)? {
            ModuleCategory::UserId => {
                debug!(name = provider.name(), %category, "registering submodule");
                self.user_id.retain(|existing| existing.name() != provider.name());
                self.user_id.push(provider);
            }
        }
        Ok(())
    }

    /// Look up a user-id submodule by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn UserIdSubmodule>> {
        self.user_id.iter().find(|m| m.name() == name).cloned()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.user_id.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.user_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_empty()
    }

    /// Call `get_id` on every configured submodule that is registered.
    ///
    /// Configs naming unknown submodules are skipped.
    pub fn request_ids(
        &self,
        configs: &[SubmoduleConfig],
        consent: Option<&ConsentData>,
    ) -> Vec<(String, IdResult)> {
        configs
            .iter()
            .filter_map(|config| {
                let module = self.get(&config.name)?;
                Some((config.name.clone(), module.get_id(config, consent)))
            })
            .collect()
    }
}

impl std::fmt::Debug for SubmoduleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmoduleRegistry")
            .field("user_id", &self.names())
            .finish()
    }
}
