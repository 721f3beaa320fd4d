//! LMDB-backed local key-value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) as a durable stand-in for
//! browser local storage. Like local storage it has no expiry: values live
//! until overwritten or removed.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get_item`
//! - Write transactions for `set_item` and `remove_item`

use std::path::Path;

use adriver_core::{AdriverError, AdriverResult, StorageError};
use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};

use crate::traits::{Backend, LocalStore};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for AdriverError {
    fn from(e: LmdbStoreError) -> Self {
        AdriverError::Storage(StorageError::Unavailable {
            reason: e.to_string(),
        })
    }
}

/// Durable local store over a single unnamed LMDB database.
pub struct LmdbLocalStore {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbLocalStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            LmdbStoreError::EnvOpen(format!("map size of {} MB overflows", max_size_mb))
        })?;

        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        Ok(Self { env, db })
    }
}

fn read_failed(key: &str, e: heed::Error) -> AdriverError {
    StorageError::ReadFailed {
        backend: Backend::LocalStorage.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    }
    .into()
}

fn write_failed(key: &str, e: heed::Error) -> AdriverError {
    StorageError::WriteFailed {
        backend: Backend::LocalStorage.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    }
    .into()
}

fn remove_failed(key: &str, e: heed::Error) -> AdriverError {
    StorageError::RemoveFailed {
        backend: Backend::LocalStorage.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    }
    .into()
}

impl LocalStore for LmdbLocalStore {
    fn get_item(&self, key: &str) -> AdriverResult<Option<String>> {
        let rtxn = self.env.read_txn().map_err(|e| read_failed(key, e))?;
        let value = self
            .db
            .get(&rtxn, key)
            .map_err(|e| read_failed(key, e))?
            .map(str::to_string);
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> AdriverResult<()> {
        let mut wtxn = self.env.write_txn().map_err(|e| write_failed(key, e))?;
        self.db
            .put(&mut wtxn, key, value)
            .map_err(|e| write_failed(key, e))?;
        wtxn.commit().map_err(|e| write_failed(key, e))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AdriverResult<()> {
        let mut wtxn = self.env.write_txn().map_err(|e| remove_failed(key, e))?;
        self.db
            .delete(&mut wtxn, key)
            .map_err(|e| remove_failed(key, e))?;
        wtxn.commit().map_err(|e| remove_failed(key, e))?;
        Ok(())
    }
}

impl std::fmt::Debug for LmdbLocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbLocalStore")
            .field("path", &self.env.path())
            .finish()
    }
}
