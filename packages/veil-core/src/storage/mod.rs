//! # Storage Module
//!
//! Transactional key and record store backing the wallet.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Store ──session()──► StoreSession                              │   │
//! │  │                                                                 │   │
//! │  │  Keys     insert_key / fetch_key / update_key                  │   │
//! │  │           name = verkey, secret sealed at rest (optional)       │   │
//! │  │                                                                 │   │
//! │  │  Records  insert / replace / fetch / fetch_all                 │   │
//! │  │           (category, name) → value + exact-match tags          │   │
//! │  │                                                                 │   │
//! │  │  commit() makes writes final and releases record locks         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Backends:                                                             │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐          │
//! │  │  MemoryStore             │   │  SqliteStore             │          │
//! │  │  per-record locks        │   │  one IMMEDIATE           │          │
//! │  │  taken on for_update     │   │  transaction / session   │          │
//! │  └──────────────────────────┘   └──────────────────────────┘          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! A fetch with `for_update = true` holds the record (or key) exclusively
//! until the session commits or is dropped. Two sessions racing to update
//! the same DID record are therefore serialized: the second one reads what
//! the first one wrote.

mod database;
mod memory;
mod schema;
mod secure_store;

pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use secure_store::KeySealer;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::crypto::{LocalKey, StoreKey};
use crate::error::{Error, Result};

/// Exact-match tags attached to keys and records
pub type Tags = BTreeMap<String, String>;

/// Conjunction of exact tag matches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    terms: Tags,
}

impl TagFilter {
    /// Filter matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require tag `name` to equal `value`
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms.insert(name.into(), value.into());
        self
    }

    /// Whether `tags` satisfy every term
    pub fn matches(&self, tags: &Tags) -> bool {
        self.terms
            .iter()
            .all(|(name, value)| tags.get(name) == Some(value))
    }

    /// The individual terms
    pub fn terms(&self) -> impl Iterator<Item = (&String, &String)> {
        self.terms.iter()
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Record category
    pub category: String,
    /// Record name, unique within its category
    pub name: String,
    /// Raw value
    pub value: Vec<u8>,
    /// Tags
    pub tags: Tags,
}

impl Entry {
    /// Parse the value as JSON
    pub fn value_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

/// A stored key
#[derive(Debug)]
pub struct KeyEntry {
    /// Key name (the verkey)
    pub name: String,
    /// Metadata as stored (JSON text)
    pub metadata: Option<String>,
    /// Tags
    pub tags: Tags,
    /// Handle to the secret key
    pub key: LocalKey,
}

/// A transactional view of a store
///
/// Writes become final on [`StoreSession::commit`]. A session dropped
/// without committing releases its locks; the SQLite backend also rolls
/// its writes back.
pub trait StoreSession {
    /// Insert a key under `name`; `DuplicateKey` if one exists
    fn insert_key(
        &mut self,
        name: &str,
        key: &LocalKey,
        metadata: Option<&str>,
        tags: &Tags,
    ) -> Result<()>;

    /// Fetch a key, locking it when `for_update` is set
    fn fetch_key(&mut self, name: &str, for_update: bool) -> Result<Option<KeyEntry>>;

    /// Replace a key's metadata and tags; `NotFound` if absent
    fn update_key(&mut self, name: &str, metadata: Option<&str>, tags: &Tags) -> Result<()>;

    /// Fetch a record, locking it when `for_update` is set
    fn fetch(&mut self, category: &str, name: &str, for_update: bool) -> Result<Option<Entry>>;

    /// Records of a category matching `filter`, in insertion order
    fn fetch_all(
        &mut self,
        category: &str,
        filter: Option<&TagFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>>;

    /// Insert a record; `DuplicateKey` if (category, name) exists
    fn insert(&mut self, category: &str, name: &str, value: &[u8], tags: &Tags) -> Result<()>;

    /// Overwrite a record's value and tags; `NotFound` if absent
    fn replace(&mut self, category: &str, name: &str, value: &[u8], tags: &Tags) -> Result<()>;

    /// Make this session's writes final
    fn commit(self: Box<Self>) -> Result<()>;
}

/// A key and record store
pub trait Store: Send + Sync {
    /// Open a session
    fn session(&self) -> Result<Box<dyn StoreSession + '_>>;
}

/// Which backend to open
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Volatile in-memory store
    #[default]
    Memory,
    /// SQLite database file
    Sqlite {
        /// Path of the database file; created if missing
        path: PathBuf,
    },
}

/// Open the backend described by `config`
pub fn open(config: &StorageConfig, store_key: Option<StoreKey>) -> Result<Arc<dyn Store>> {
    let sealer = KeySealer::new(store_key);
    Ok(match config {
        StorageConfig::Memory => Arc::new(MemoryStore::new(sealer)),
        StorageConfig::Sqlite { path } => Arc::new(SqliteStore::open(path, sealer)?),
    })
}

pub(crate) fn duplicate_record(category: &str, name: &str) -> Error {
    Error::DuplicateKey(format!("Record '{}' already exists in '{}'", name, category))
}

pub(crate) fn missing_record(category: &str, name: &str) -> Error {
    Error::NotFound(format!("Record '{}' not found in '{}'", name, category))
}

pub(crate) fn missing_key(name: &str) -> Error {
    Error::NotFound(format!("Key '{}' not found", name))
}

// ============================================================================
// BACKEND CONTRACT TESTS
// ============================================================================
