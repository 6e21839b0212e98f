//! Process-wide storage handle shared by the feedback and form repositories.
//!
//! # Responsibility
//! - Open the configured SQLite target lazily, on first use, and keep the
//!   connection for the lifetime of the gateway.
//! - Expose the per-package collection registry.
//!
//! # Invariants
//! - A failed open leaves the gateway unconnected; the next call retries.
//! - Collection names are only registered through feedback writes.

use super::{open_db, open_db_in_memory, DbResult};
use log::{info, warn};
use once_cell::unsync::OnceCell;
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Where the gateway stores its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// SQLite database file, created on first open.
    File(PathBuf),
    /// Private in-memory database; data lives as long as the gateway.
    InMemory,
}

impl StorageTarget {
    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::InMemory => "memory",
        }
    }
}

impl Display for StorageTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::InMemory => write!(f, "memory"),
        }
    }
}

/// Lazily connected handle to the document store.
///
/// Construct one per process and lend it to every repository.
pub struct StorageGateway {
    target: StorageTarget,
    conn: OnceCell<Connection>,
}

impl StorageGateway {
    pub fn new(target: StorageTarget) -> Self {
        Self {
            target,
            conn: OnceCell::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StorageTarget::InMemory)
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(StorageTarget::File(path.into()))
    }

    pub fn target(&self) -> &StorageTarget {
        &self.target
    }

    /// Whether the underlying connection has been opened already.
    pub fn is_connected(&self) -> bool {
        self.conn.get().is_some()
    }

    /// Returns the migrated connection, opening it on first call.
    ///
    /// # Errors
    /// - Returns the open/bootstrap error when the store cannot be reached.
    ///   Callers report this as storage being unavailable.
    pub fn connection(&self) -> DbResult<&Connection> {
        self.conn.get_or_try_init(|| {
            let opened = match &self.target {
                StorageTarget::File(path) => open_db(path),
                StorageTarget::InMemory => open_db_in_memory(),
            };
            match &opened {
                Ok(_) => info!(
                    "event=gateway_connect module=db status=ok mode={}",
                    self.target.mode()
                ),
                Err(err) => warn!(
                    "event=gateway_connect module=db status=error mode={} error={}",
                    self.target.mode(),
                    err
                ),
            }
            opened
        })
    }

    /// Returns whether a feedback collection exists for `name`.
    pub fn collection_exists(&self, name: &str) -> DbResult<bool> {
        Ok(collection_exists_in(self.connection()?, name)?)
    }

    /// Lists every feedback collection name, sorted ascending.
    pub fn list_collections(&self) -> DbResult<Vec<String>> {
        Ok(list_collections_in(self.connection()?)?)
    }
}

pub(crate) fn collection_exists_in(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM feedback_collections WHERE name = ?1;",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn ensure_collection_in(
    conn: &Connection,
    name: &str,
    created_at: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO feedback_collections (name, created_at) VALUES (?1, ?2);",
        params![name, created_at],
    )?;
    Ok(())
}

pub(crate) fn list_collections_in(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM feedback_collections ORDER BY name ASC;")?;
    let mut rows = stmt.query([])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}
