//! # Database
//!
//! SQLite-backed store.
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │     Wallet      │                                                   │
//! │  └────────┬────────┘                                                   │
//! │           │ session()                                                   │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │  SqliteSession  │  Holds the connection for its lifetime            │
//! │  │                 │  - BEGIN IMMEDIATE on open                        │
//! │  │                 │  - COMMIT on commit()                             │
//! │  │                 │  - ROLLBACK when dropped uncommitted              │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  keys, key_tags, items, item_tags                 │
//! │  │   (file or      │  - In-memory for tests                            │
//! │  │    memory)      │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sessions are serialized on the connection mutex, so a `for_update` fetch
//! is exclusive for as long as the session lives.

use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::{
    duplicate_record, missing_key, missing_record, schema, Entry, KeyEntry, KeySealer, Store,
    StoreSession, TagFilter, Tags,
};
use crate::crypto::{KeyType, LocalKey};
use crate::error::{Error, Result};

/// SQLite store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    sealer: KeySealer,
}

impl SqliteStore {
    /// Open or create a database file
    pub fn open(path: impl AsRef<Path>, sealer: KeySealer) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::StoreError(format!("Failed to open database: {}", e)))?;
        tracing::info!(
            encrypted = sealer.is_encrypted(),
            "Opened SQLite store at {}",
            path.display()
        );
        Self::from_connection(conn, sealer)
    }

    /// Create an in-memory database (useful for testing)
    pub fn open_in_memory(sealer: KeySealer) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::StoreError(format!("Failed to create in-memory database: {}", e))
        })?;
        Self::from_connection(conn, sealer)
    }

    fn from_connection(conn: Connection, sealer: KeySealer) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            sealer,
        })
    }

    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> Result<()> {
        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::StoreError(format!("Failed to create tables: {}", e)))?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::StoreError(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v > schema::SCHEMA_VERSION => {
                return Err(Error::StoreError(format!(
                    "Database schema version {} is newer than supported {}",
                    v,
                    schema::SCHEMA_VERSION
                )));
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }
}

impl Store for SqliteStore {
    fn session(&self) -> Result<Box<dyn StoreSession + '_>> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| Error::StoreError(format!("Failed to begin transaction: {}", e)))?;
        Ok(Box::new(SqliteSession {
            conn,
            sealer: &self.sealer,
            finished: false,
        }))
    }
}

#[derive(Clone, Copy)]
enum TagTable {
    Keys,
    Items,
}

impl TagTable {
    fn select_sql(self) -> &'static str {
        match self {
            TagTable::Keys => "SELECT name, value FROM key_tags WHERE key_id = ?",
            TagTable::Items => "SELECT name, value FROM item_tags WHERE item_id = ?",
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            TagTable::Keys => "DELETE FROM key_tags WHERE key_id = ?",
            TagTable::Items => "DELETE FROM item_tags WHERE item_id = ?",
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            TagTable::Keys => "INSERT INTO key_tags (key_id, name, value) VALUES (?, ?, ?)",
            TagTable::Items => "INSERT INTO item_tags (item_id, name, value) VALUES (?, ?, ?)",
        }
    }
}

struct SqliteSession<'a> {
    conn: MutexGuard<'a, Connection>,
    sealer: &'a KeySealer,
    finished: bool,
}

impl SqliteSession<'_> {
    fn load_tags(&self, table: TagTable, id: i64) -> Result<Tags> {
        let mut stmt = self.conn.prepare_cached(table.select_sql())?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let tags = rows.collect::<rusqlite::Result<Tags>>()?;
        Ok(tags)
    }

    fn write_tags(&self, table: TagTable, id: i64, tags: &Tags) -> Result<()> {
        self.conn.execute(table.delete_sql(), params![id])?;
        let mut stmt = self.conn.prepare_cached(table.insert_sql())?;
        for (name, value) in tags {
            stmt.execute(params![id, name, value])?;
        }
        Ok(())
    }

    fn key_id(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM keys WHERE name = ?", params![name], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn item_id(&self, category: &str, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM items WHERE category = ? AND name = ?",
                params![category, name],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl Drop for SqliteSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!("Failed to roll back store session: {}", e);
            }
        }
    }
}

impl StoreSession for SqliteSession<'_> {
    fn insert_key(
        &mut self,
        name: &str,
        key: &LocalKey,
        metadata: Option<&str>,
        tags: &Tags,
    ) -> Result<()> {
        if self.key_id(name)?.is_some() {
            return Err(Error::DuplicateKey(format!("Key '{}' already exists", name)));
        }
        let secret = self.sealer.protect(name, key)?;
        self.conn
            .execute(
                "INSERT INTO keys (name, key_type, secret, metadata) VALUES (?, ?, ?, ?)",
                params![name, key.key_type().as_str(), secret, metadata],
            )
            .map_err(|e| Error::StoreError(format!("Failed to insert key: {}", e)))?;
        let id = self.conn.last_insert_rowid();
        self.write_tags(TagTable::Keys, id, tags)
    }

    fn fetch_key(&mut self, name: &str, _for_update: bool) -> Result<Option<KeyEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, key_type, secret, metadata FROM keys WHERE name = ?",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, key_type, secret, metadata)) = row else {
            return Ok(None);
        };
        if key_type.parse::<KeyType>()? != KeyType::Ed25519 {
            return Err(Error::UnsupportedKeyType(key_type));
        }

        Ok(Some(KeyEntry {
            name: name.to_string(),
            metadata,
            tags: self.load_tags(TagTable::Keys, id)?,
            key: self.sealer.recover(name, &secret)?,
        }))
    }

    fn update_key(&mut self, name: &str, metadata: Option<&str>, tags: &Tags) -> Result<()> {
        let id = self.key_id(name)?.ok_or_else(|| missing_key(name))?;
        self.conn
            .execute(
                "UPDATE keys SET metadata = ? WHERE id = ?",
                params![metadata, id],
            )
            .map_err(|e| Error::StoreError(format!("Failed to update key: {}", e)))?;
        self.write_tags(TagTable::Keys, id, tags)
    }

    fn fetch(&mut self, category: &str, name: &str, _for_update: bool) -> Result<Option<Entry>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, value FROM items WHERE category = ? AND name = ?",
                params![category, name],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()?;

        match row {
            Some((id, value)) => Ok(Some(Entry {
                category: category.to_string(),
                name: name.to_string(),
                value,
                tags: self.load_tags(TagTable::Items, id)?,
            })),
            None => Ok(None),
        }
    }

    fn fetch_all(
        &mut self,
        category: &str,
        filter: Option<&TagFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>> {
        let mut sql = String::from("SELECT id, name, value FROM items WHERE category = ?");
        let mut args: Vec<&dyn ToSql> = vec![&category];
        if let Some(filter) = filter {
            for (name, value) in filter.terms() {
                sql.push_str(
                    " AND EXISTS (SELECT 1 FROM item_tags t \
                     WHERE t.item_id = items.id AND t.name = ? AND t.value = ?)",
                );
                args.push(name);
                args.push(value);
            }
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = {
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(args.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        rows.into_iter()
            .map(|(id, name, value)| {
                Ok(Entry {
                    category: category.to_string(),
                    name,
                    value,
                    tags: self.load_tags(TagTable::Items, id)?,
                })
            })
            .collect()
    }

    fn insert(&mut self, category: &str, name: &str, value: &[u8], tags: &Tags) -> Result<()> {
        if self.item_id(category, name)?.is_some() {
            return Err(duplicate_record(category, name));
        }
        self.conn
            .execute(
                "INSERT INTO items (category, name, value) VALUES (?, ?, ?)",
                params![category, name, value],
            )
            .map_err(|e| Error::StoreError(format!("Failed to insert record: {}", e)))?;
        let id = self.conn.last_insert_rowid();
        self.write_tags(TagTable::Items, id, tags)
    }

    fn replace(&mut self, category: &str, name: &str, value: &[u8], tags: &Tags) -> Result<()> {
        let id = self
            .item_id(category, name)?
            .ok_or_else(|| missing_record(category, name))?;
        self.conn
            .execute(
                "UPDATE items SET value = ? WHERE id = ?",
                params![value, id],
            )
            .map_err(|e| Error::StoreError(format!("Failed to replace record: {}", e)))?;
        self.write_tags(TagTable::Items, id, tags)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| Error::StoreError(format!("Failed to commit: {}", e)))?;
        self.finished = true;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
