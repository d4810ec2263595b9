//! # Database Schema
//!
//! SQL schema definitions for the SQLite store.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌─────────────────┐                            │
//! │  │      keys       │    │    key_tags     │                            │
//! │  ├─────────────────┤    ├─────────────────┤                            │
//! │  │ id              │◄───│ key_id          │                            │
//! │  │ name (verkey)   │    │ name            │                            │
//! │  │ key_type        │    │ value           │                            │
//! │  │ secret          │    └─────────────────┘                            │
//! │  │ metadata        │                                                   │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! │  ┌─────────────────┐    ┌─────────────────┐                            │
//! │  │      items      │    │   item_tags     │                            │
//! │  ├─────────────────┤    ├─────────────────┤                            │
//! │  │ id              │◄───│ item_id         │                            │
//! │  │ category        │    │ name            │                            │
//! │  │ name            │    │ value           │                            │
//! │  │ value           │    └─────────────────┘                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Secret keys, named by verkey
CREATE TABLE IF NOT EXISTS keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    -- Key algorithm ('ed25519')
    key_type TEXT NOT NULL,
    -- Raw secret, or nonce || AES-GCM ciphertext when a store key is set
    secret BLOB NOT NULL,
    -- Caller metadata (JSON text)
    metadata TEXT
);

CREATE TABLE IF NOT EXISTS key_tags (
    key_id INTEGER NOT NULL REFERENCES keys(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key_id, name)
);

-- Records (DIDs and anything else), unique per category
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    value BLOB NOT NULL,
    UNIQUE (category, name)
);

CREATE TABLE IF NOT EXISTS item_tags (
    item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (item_id, name)
);
CREATE INDEX IF NOT EXISTS idx_item_tags_lookup ON item_tags(name, value);
"#;
