//! In-memory store.
//!
//! Writes apply as soon as they are made; there is no rollback. Locks taken
//! by `for_update` fetches are held until the session commits or drops.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex, RwLock};

use super::{
    duplicate_record, missing_key, missing_record, Entry, KeyEntry, KeySealer, Store,
    StoreSession, TagFilter, Tags,
};
use crate::crypto::{KeyType, LocalKey};
use crate::error::{Error, Result};

struct StoredKey {
    key_type: KeyType,
    secret: Vec<u8>,
    metadata: Option<String>,
    tags: Tags,
}

struct StoredRecord {
    seq: u64,
    value: Vec<u8>,
    tags: Tags,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum LockId {
    Key(String),
    Record(String, String),
}

/// Volatile store for tests and short-lived agents
pub struct MemoryStore {
    keys: RwLock<HashMap<String, StoredKey>>,
    records: RwLock<HashMap<(String, String), StoredRecord>>,
    next_seq: AtomicU64,
    locked: Mutex<HashSet<LockId>>,
    released: Condvar,
    sealer: KeySealer,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(sealer: KeySealer) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            locked: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            sealer,
        }
    }

    fn acquire(&self, id: &LockId) {
        let mut locked = self.locked.lock();
        while locked.contains(id) {
            self.released.wait(&mut locked);
        }
        locked.insert(id.clone());
    }

    fn release(&self, ids: &HashSet<LockId>) {
        let mut locked = self.locked.lock();
        for id in ids {
            locked.remove(id);
        }
        self.released.notify_all();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(KeySealer::default())
    }
}

impl Store for MemoryStore {
    fn session(&self) -> Result<Box<dyn StoreSession + '_>> {
        Ok(Box::new(MemorySession {
            store: self,
            held: HashSet::new(),
        }))
    }
}

struct MemorySession<'a> {
    store: &'a MemoryStore,
    held: HashSet<LockId>,
}

impl MemorySession<'_> {
    fn lock(&mut self, id: LockId) {
        if !self.held.contains(&id) {
            self.store.acquire(&id);
            self.held.insert(id);
        }
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        if !self.held.is_empty() {
            self.store.release(&self.held);
        }
    }
}

impl StoreSession for MemorySession<'_> {
    fn insert_key(
        &mut self,
        name: &str,
        key: &LocalKey,
        metadata: Option<&str>,
        tags: &Tags,
    ) -> Result<()> {
        let secret = self.store.sealer.protect(name, key)?;
        let mut keys = self.store.keys.write();
        if keys.contains_key(name) {
            return Err(Error::DuplicateKey(format!("Key '{}' already exists", name)));
        }
        keys.insert(
            name.to_string(),
            StoredKey {
                key_type: key.key_type(),
                secret,
                metadata: metadata.map(str::to_string),
                tags: tags.clone(),
            },
        );
        Ok(())
    }

    fn fetch_key(&mut self, name: &str, for_update: bool) -> Result<Option<KeyEntry>> {
        if for_update {
            self.lock(LockId::Key(name.to_string()));
        }
        let keys = self.store.keys.read();
        let Some(stored) = keys.get(name) else {
            return Ok(None);
        };
        if stored.key_type != KeyType::Ed25519 {
            return Err(Error::UnsupportedKeyType(stored.key_type.to_string()));
        }
        Ok(Some(KeyEntry {
            name: name.to_string(),
            metadata: stored.metadata.clone(),
            tags: stored.tags.clone(),
            key: self.store.sealer.recover(name, &stored.secret)?,
        }))
    }

    fn update_key(&mut self, name: &str, metadata: Option<&str>, tags: &Tags) -> Result<()> {
        let mut keys = self.store.keys.write();
        let stored = keys.get_mut(name).ok_or_else(|| missing_key(name))?;
        stored.metadata = metadata.map(str::to_string);
        stored.tags = tags.clone();
        Ok(())
    }

    fn fetch(&mut self, category: &str, name: &str, for_update: bool) -> Result<Option<Entry>> {
        if for_update {
            self.lock(LockId::Record(category.to_string(), name.to_string()));
        }
        let records = self.store.records.read();
        Ok(records
            .get(&(category.to_string(), name.to_string()))
            .map(|stored| Entry {
                category: category.to_string(),
                name: name.to_string(),
                value: stored.value.clone(),
                tags: stored.tags.clone(),
            }))
    }

    fn fetch_all(
        &mut self,
        category: &str,
        filter: Option<&TagFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>> {
        let records = self.store.records.read();
        let mut matching: Vec<_> = records
            .iter()
            .filter(|((cat, _), stored)| {
                cat == category && filter.map_or(true, |f| f.matches(&stored.tags))
            })
            .collect();
        matching.sort_by_key(|(_, stored)| stored.seq);

        Ok(matching
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|((cat, name), stored)| Entry {
                category: cat.clone(),
                name: name.clone(),
                value: stored.value.clone(),
                tags: stored.tags.clone(),
            })
            .collect())
    }

    fn insert(&mut self, category: &str, name: &str, value: &[u8], tags: &Tags) -> Result<()> {
        let mut records = self.store.records.write();
        let id = (category.to_string(), name.to_string());
        if records.contains_key(&id) {
            return Err(duplicate_record(category, name));
        }
        records.insert(
            id,
            StoredRecord {
                seq: self.store.next_seq.fetch_add(1, Ordering::Relaxed),
                value: value.to_vec(),
                tags: tags.clone(),
            },
        );
        Ok(())
    }

    fn replace(&mut self, category: &str, name: &str, value: &[u8], tags: &Tags) -> Result<()> {
        let mut records = self.store.records.write();
        let stored = records
            .get_mut(&(category.to_string(), name.to_string()))
            .ok_or_else(|| missing_record(category, name))?;
        stored.value = value.to_vec();
        stored.tags = tags.clone();
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        // Dropping releases the held locks
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
