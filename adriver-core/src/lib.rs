//! AdRiver ID Core - Data Types
//!
//! Identifier, result and host-boundary types shared by every other crate in
//! the workspace, plus configuration and the error taxonomy.
//! This crate contains no I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod expiry;

pub use config::{ExpiryPolicy, RefreshMode, SyncConfig};
pub use error::{AdriverError, AdriverResult, ConfigError, ResolverError, StorageError};
pub use expiry::ExpiryClock;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Name the submodule is registered under in the host.
pub const MODULE_NAME: &str = "adriverId";

/// IAB global vendor list id. Carried for consent bookkeeping only.
pub const GVLID: u16 = 375;

/// Slot name used in both storage backends.
pub const STORAGE_KEY: &str = "adriverId";

/// Identity-resolution endpoint.
pub const RESOLVER_ENDPOINT: &str = "https://sspid.adriver.ru/adriverid";

/// Cookie retention window: 13 months of 30 days.
pub const COOKIE_MAX_AGE: Duration = Duration::from_secs(13 * 30 * 24 * 60 * 60);

// ============================================================================
// IDENTIFIER TYPES
// ============================================================================

/// Opaque identifier assigned by the resolver.
///
/// Never empty: the only constructor is [`AdriverId::parse`], which rejects
/// blank input the same way the storage write guard does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdriverId(String);

impl AdriverId {
    /// Accept a raw value if it is present and non-empty.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some(value) if !value.is_empty() => Some(Self(value.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for AdriverId {
    type Error = EmptyIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(EmptyIdentifier)
        } else {
            Ok(Self(value))
        }
    }
}

impl From<AdriverId> for String {
    fn from(id: AdriverId) -> Self {
        id.0
    }
}

impl fmt::Display for AdriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when an empty string is offered as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyIdentifier;

impl fmt::Display for EmptyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("identifier must not be empty")
    }
}

impl std::error::Error for EmptyIdentifier {}

/// The object handed to the host: `{ "adriverId": "<value>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedId {
    #[serde(rename = "adriverId")]
    pub adriver_id: AdriverId,
}

impl DecodedId {
    pub fn new(adriver_id: AdriverId) -> Self {
        Self { adriver_id }
    }
}

/// Result of a `getId` call: `{ "id": { "adriverId": ... } }` or `{ "id": null }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdResult {
    pub id: Option<DecodedId>,
}

impl IdResult {
    /// Wrap a value read from storage. Blank values yield an empty result.
    pub fn from_stored(value: Option<String>) -> Self {
        Self {
            id: AdriverId::parse(value.as_deref()).map(DecodedId::new),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// Borrow the identifier, if any.
    pub fn adriver_id(&self) -> Option<&str> {
        self.id.as_ref().map(|d| d.adriver_id.as_str())
    }
}

// ============================================================================
// HOST BOUNDARY TYPES
// ============================================================================

/// Consent signal supplied by the host.
///
/// Accepted for interface compatibility; nothing in this workspace reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentData {
    pub gdpr_applies: Option<bool>,
    pub consent_string: Option<String>,
    pub api_version: Option<u8>,
}

/// Storage hints the host may attach to a submodule config.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageHints {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub storage_type: Option<String>,
    pub expires: Option<u32>,
}

/// Per-submodule configuration block from the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmoduleConfig {
    pub name: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub storage: Option<StorageHints>,
}

impl SubmoduleConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Host registry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleCategory {
    #[serde(rename = "userId")]
    UserId,
}

impl ModuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserId => "userId",
        }
    }

    pub fn from_name(s: &str) -> Result<Self, ConfigError> {
        match s {
            "userId" => Ok(Self::UserId),
            _ => Err(ConfigError::UnknownCategory {
                category: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
