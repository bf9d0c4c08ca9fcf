//! Persistent key/value store behind the index
//!
//! The loader and the query tool only need a handful of capabilities from the
//! storage engine, captured by [`KvStore`]. [`SqliteStore`] provides them on
//! top of a single-file SQLite database.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;

/// Storage capabilities needed to build and query the index
pub trait KvStore {
    /// Insert or overwrite `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Insert or overwrite `key`, returning the value it held before.
    fn set_and_get(&mut self, key: &str, value: &str) -> Result<Option<String>>;

    /// Look up many keys in one call. Missing keys are absent from the
    /// result; a key repeated in `keys` appears once.
    fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>>;

    /// Flush everything durably and release the store.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// How to open a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Store file
    pub path: PathBuf,

    /// Open for writing (creating the file if missing) instead of read-only
    pub writable: bool,

    /// Discard existing contents on open (writable only)
    pub truncate: bool,

    /// Fail immediately instead of waiting when another process holds the store
    pub no_wait: bool,

    /// Sync every commit to stable storage
    pub sync_hard: bool,

    /// Expected number of entries, recorded when the store is created
    pub num_buckets: u64,
}

impl StoreOptions {
    /// Options for a fresh, exclusively held, durable store
    pub fn create_truncate(path: impl Into<PathBuf>, num_buckets: u64) -> Self {
        Self {
            path: path.into(),
            writable: true,
            truncate: true,
            no_wait: true,
            sync_hard: true,
            num_buckets,
        }
    }

    /// Options for reading an existing store
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writable: false,
            truncate: false,
            no_wait: true,
            sync_hard: false,
            num_buckets: 0,
        }
    }
}
