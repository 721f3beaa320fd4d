//! Sync configuration
//!
//! Defaults carry the module's compile-time constants. Deployments that need
//! a different endpoint or retention can override them from the environment.

use crate::{AdriverResult, ConfigError, COOKIE_MAX_AGE, RESOLVER_ENDPOINT, STORAGE_KEY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the cookie expiration timestamp is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryPolicy {
    /// Computed once when the expiry clock is built and reused for every write.
    FrozenAtLoad,
    /// Recomputed as `now + retention` on every write.
    #[default]
    PerWrite,
}

impl ExpiryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrozenAtLoad => "frozen",
            Self::PerWrite => "per-write",
        }
    }

    pub fn from_name(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "frozen" | "frozen-at-load" => Ok(Self::FrozenAtLoad),
            "per-write" => Ok(Self::PerWrite),
            other => Err(ConfigError::InvalidValue {
                field: "expiry_policy".to_string(),
                value: other.to_string(),
                reason: "expected 'frozen' or 'per-write'".to_string(),
            }),
        }
    }
}

/// Whether concurrent `getId` calls share an outstanding refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMode {
    /// Every call dispatches its own resolver request.
    #[default]
    Independent,
    /// Skip dispatch while a refresh is already in flight.
    Coalesce,
}

impl RefreshMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::Coalesce => "coalesce",
        }
    }

    pub fn from_name(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "independent" => Ok(Self::Independent),
            "coalesce" => Ok(Self::Coalesce),
            other => Err(ConfigError::InvalidValue {
                field: "refresh_mode".to_string(),
                value: other.to_string(),
                reason: "expected 'independent' or 'coalesce'".to_string(),
            }),
        }
    }
}

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Slot name in both storage backends.
    pub storage_key: String,
    /// Resolver endpoint (GET).
    pub endpoint: String,
    /// Cookie retention window.
    pub retention: Duration,
    pub expiry_policy: ExpiryPolicy,
    pub refresh_mode: RefreshMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            endpoint: RESOLVER_ENDPOINT.to_string(),
            retention: COOKIE_MAX_AGE,
            expiry_policy: ExpiryPolicy::default(),
            refresh_mode: RefreshMode::default(),
        }
    }
}

impl SyncConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create SyncConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ADRIVER_ID_ENDPOINT`: Resolver URL (default: the AdRiver endpoint)
    /// - `ADRIVER_ID_STORAGE_KEY`: Slot name (default: "adriverId")
    /// - `ADRIVER_ID_RETENTION_DAYS`: Cookie retention in days (default: 390)
    /// - `ADRIVER_ID_EXPIRY_POLICY`: "per-write" or "frozen" (default: per-write)
    /// - `ADRIVER_ID_REFRESH_MODE`: "independent" or "coalesce" (default: independent)
    ///
    /// Unparsable values fall back to the default; call [`validate`](Self::validate)
    /// afterwards to reject values that parse but make no sense.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoint = std::env::var("ADRIVER_ID_ENDPOINT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.endpoint);

        let storage_key = std::env::var("ADRIVER_ID_STORAGE_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.storage_key);

        let retention = std::env::var("ADRIVER_ID_RETENTION_DAYS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .and_then(|days| days.checked_mul(24 * 60 * 60))
            .map(Duration::from_secs)
            .unwrap_or(defaults.retention);

        let expiry_policy = std::env::var("ADRIVER_ID_EXPIRY_POLICY")
            .ok()
            .and_then(|s| ExpiryPolicy::from_name(&s).ok())
            .unwrap_or(defaults.expiry_policy);

        let refresh_mode = std::env::var("ADRIVER_ID_REFRESH_MODE")
            .ok()
            .and_then(|s| RefreshMode::from_name(&s).ok())
            .unwrap_or(defaults.refresh_mode);

        Self {
            storage_key,
            endpoint,
            retention,
            expiry_policy,
            refresh_mode,
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - storage_key is non-empty
    /// - endpoint is an http(s) URL
    /// - retention is positive
    pub fn validate(&self) -> AdriverResult<()> {
        if self.storage_key.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "storage_key".to_string(),
            }
            .into());
        }

        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "endpoint".to_string(),
            }
            .into());
        }

        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                field: "endpoint".to_string(),
                value: self.endpoint.clone(),
                reason: "must be an http or https URL".to_string(),
            }
            .into());
        }

        if self.retention.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "retention".to_string(),
                value: format!("{:?}", self.retention),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdriverError;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 5] = [
        "ADRIVER_ID_ENDPOINT",
        "ADRIVER_ID_STORAGE_KEY",
        "ADRIVER_ID_RETENTION_DAYS",
        "ADRIVER_ID_EXPIRY_POLICY",
        "ADRIVER_ID_REFRESH_MODE",
    ];

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    /// Set every config variable; `None` entries are removed.
    fn set_env(values: [Option<&str>; 5]) -> Vec<EnvVarGuard> {
        ENV_KEYS
            .iter()
            .zip(values)
            .map(|(key, value)| EnvVarGuard::set(*key, value))
            .collect()
    }

    #[test]
    fn test_from_env_unset_uses_defaults() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _guards = set_env([None; 5]);
        assert_eq!(SyncConfig::from_env(), SyncConfig::default());
    }

    #[test]
    fn test_from_env_full_override() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _guards = set_env([
            Some("http://localhost:8080/adriverid"),
            Some("bidId"),
            Some(" 7 "),
            Some("frozen"),
            Some("coalesce"),
        ]);

        let config = SyncConfig::from_env();
        assert_eq!(config.endpoint, "http://localhost:8080/adriverid");
        assert_eq!(config.storage_key, "bidId");
        assert_eq!(config.retention, Duration::from_secs(7 * 86_400));
        assert_eq!(config.expiry_policy, ExpiryPolicy::FrozenAtLoad);
        assert_eq!(config.refresh_mode, RefreshMode::Coalesce);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_unparsable_values_fall_back() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _guards = set_env([
            Some("   "),
            Some(""),
            Some("abc"),
            Some("never"),
            Some("dedupe"),
        ]);

        assert_eq!(SyncConfig::from_env(), SyncConfig::default());
    }

    #[test]
    fn test_from_env_overflowing_retention_falls_back() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _guards = set_env([None, None, Some("18446744073709551615"), None, None]);

        assert_eq!(SyncConfig::from_env().retention, COOKIE_MAX_AGE);
    }

    #[test]
    fn test_from_env_zero_retention_parses_but_fails_validation() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _guards = set_env([None, None, Some("0"), None, None]);

        let config = SyncConfig::from_env();
        assert!(config.retention.is_zero());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_key, "adriverId");
        assert_eq!(config.endpoint, "https://sspid.adriver.ru/adriverid");
        assert_eq!(config.expiry_policy, ExpiryPolicy::PerWrite);
        assert_eq!(config.refresh_mode, RefreshMode::Independent);
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let config = SyncConfig::new().with_storage_key("");
        assert!(matches!(
            config.validate(),
            Err(AdriverError::Config(ConfigError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let config = SyncConfig::new().with_endpoint("ftp://sspid.adriver.ru/adriverid");
        assert!(matches!(
            config.validate(),
            Err(AdriverError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let config = SyncConfig::new().with_retention(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(ExpiryPolicy::from_name("frozen"), Ok(ExpiryPolicy::FrozenAtLoad));
        assert_eq!(ExpiryPolicy::from_name(" Per-Write "), Ok(ExpiryPolicy::PerWrite));
        assert!(ExpiryPolicy::from_name("never").is_err());
        assert_eq!(RefreshMode::from_name("coalesce"), Ok(RefreshMode::Coalesce));
        assert_eq!(RefreshMode::Coalesce.as_str(), "coalesce");
        assert!(RefreshMode::from_name("dedupe").is_err());
    }
}
