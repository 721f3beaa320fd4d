//! Error types for AdRiver ID operations

use thiserror::Error;

/// Storage backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Read failed for {backend} key {key}: {reason}")]
    ReadFailed {
        backend: String,
        key: String,
        reason: String,
    },

    #[error("Write failed for {backend} key {key}: {reason}")]
    WriteFailed {
        backend: String,
        key: String,
        reason: String,
    },

    #[error("Remove failed for {backend} key {key}: {reason}")]
    RemoveFailed {
        backend: String,
        key: String,
        reason: String,
    },

    #[error("Backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Identity resolver errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("Request to {endpoint} failed with status {status}: {message}")]
    RequestFailed {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("No async runtime available to dispatch the refresh")]
    RuntimeUnavailable,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown module category: {category}")]
    UnknownCategory { category: String },
}

/// Master error type for all AdRiver ID errors.
#[derive(Debug, Clone, Error)]
pub enum AdriverError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for AdRiver ID operations.
pub type AdriverResult<T> = Result<T, AdriverError>;

// =============================================================================
// TESTS
// =============================================================================
