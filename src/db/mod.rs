//! SQLite database module for the procurement store
//!
//! ## Architecture
//!
//! - Tender and bid rows hold the current state of each aggregate
//! - `tender_versions` / `bid_versions` hold append-only pre-edit snapshots,
//!   keyed by (entity id, version), written in the same transaction as the
//!   edit that superseded them
//! - `bid_decisions` is the append-only vote ledger
//! - `users` / `organizations` / `organization_responsibles` back the
//!   existence and authorization checks
//!
//! ## Tables
//!
//! - `tenders` - current tender state (id, fields, status, version)
//! - `bids` - current bid state (id, fields, status, version, decision)
//! - `tender_versions`, `bid_versions` - version history (params JSON)
//! - `bid_decisions` - one Approve/Reject row per (bid, user)

pub mod bids;
pub mod models;
pub mod schema;
pub mod tenders;

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use tracing::{debug, info};

use crate::error::CoreError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tenders (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    service_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Created',
    version INTEGER NOT NULL DEFAULT 1,
    organization_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bids (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Created',
    tender_id TEXT NOT NULL,
    author_type TEXT NOT NULL,
    author_id TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    decision TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tender_versions (
    tender_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    params TEXT NOT NULL,
    PRIMARY KEY (tender_id, version)
);

CREATE TABLE IF NOT EXISTS bid_versions (
    bid_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    params TEXT NOT NULL,
    PRIMARY KEY (bid_id, version)
);

CREATE TABLE IF NOT EXISTS bid_decisions (
    id TEXT PRIMARY KEY NOT NULL,
    bid_id TEXT NOT NULL,
    username TEXT NOT NULL,
    decision TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bid_decisions_bid ON bid_decisions (bid_id);

CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS organization_responsibles (
    organization_id TEXT NOT NULL,
    username TEXT NOT NULL,
    PRIMARY KEY (organization_id, username)
);
"#;

/// SQLite database handle for the procurement store.
///
/// Explicitly constructed and passed into each service; there is no ambient
/// global connection.
pub struct Db {
    pool: DbPool,
}

impl Db {
    /// Open or create the database at `path`
    pub fn open(path: &Path, pool_size: u32) -> Result<Self, CoreError> {
        info!("Opening SQLite database at {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Internal(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy().as_ref());
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| CoreError::Internal(format!("Failed to build pool: {}", e)))?;

        let db = Self { pool };

        db.with_conn(|conn| {
            // WAL for concurrent readers while a writer holds the write lock
            conn.batch_execute("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
                .map_err(|e| CoreError::Internal(format!("Failed to set PRAGMA: {}", e)))?;
            init_schema(conn)
        })?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    ///
    /// Pool size is pinned to 1: each SQLite `:memory:` connection is its own
    /// database, so every operation must reuse the same connection.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        debug!("Opening in-memory SQLite database");

        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| CoreError::Internal(format!("Failed to build pool: {}", e)))?;

        let db = Self { pool };
        db.with_conn(init_schema)?;

        Ok(db)
    }

    /// Run `f` with a pooled connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, CoreError>,
    {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| CoreError::Internal(format!("Connection pool error: {}", e)))?;
        f(&mut conn)
    }
}

fn init_schema(conn: &mut SqliteConnection) -> Result<(), CoreError> {
    conn.batch_execute(SCHEMA_SQL)
        .map_err(|e| CoreError::Internal(format!("Failed to initialize schema: {}", e)))
}

// Re-exports
pub use bids::CreateBidInput;
pub use tenders::CreateTenderInput;
