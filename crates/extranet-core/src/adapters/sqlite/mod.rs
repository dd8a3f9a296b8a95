//! # SQLite Persistence
//!
//! A single connection behind a mutex. Reads go through [`Database::read`];
//! anything that writes more than one row goes through
//! [`Database::transaction`], which commits when the closure returns `Ok`
//! and rolls back otherwise.
//!
//! Table access is split per table into free functions taking a
//! `&Connection`, so the same query runs inside or outside a transaction
//! (`Transaction` derefs to `Connection`).

pub mod categories;
pub mod files;
mod schema;
pub mod syndicats;
pub mod users;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Row, Transaction};
use tracing::{debug, info};

use crate::domain::dates::from_unix;
use crate::domain::entities::{Civilite, Role};
use crate::domain::errors::ExtranetResult;

pub use schema::SCHEMA_VERSION;

/// Shared handle to the extranet database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (creating if needed) a database file and migrates it.
    pub fn open(path: impl AsRef<Path>) -> ExtranetResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let db = Self::init(conn)?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> ExtranetResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> ExtranetResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs read-only queries.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> ExtranetResult<T>) -> ExtranetResult<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Runs `f` inside a transaction.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> ExtranetResult<T>,
    ) -> ExtranetResult<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "transaction rolled back");
                // Dropping the transaction rolls it back.
                drop(tx);
                Err(err)
            }
        }
    }

    /// Current `PRAGMA user_version`.
    pub fn schema_version(&self) -> ExtranetResult<i64> {
        self.read(|conn| Ok(schema::user_version(conn)?))
    }
}

// =============================================================================
// COLUMN CODECS
// =============================================================================

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Civilite {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Civilite {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub(crate) fn timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    Ok(from_unix(row.get(column)?))
}

pub(crate) fn optional_timestamp(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<Option<chrono::DateTime<chrono::Utc>>> {
    Ok(row.get::<_, Option<i64>>(column)?.map(from_unix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ExtranetError;

    #[test]
    fn test_in_memory_database_is_migrated() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_open_file_creates_parent_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("extranet.db");

        Database::open(&path).unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: ExtranetResult<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO categories (name, creation_date) VALUES ('PV', 0)",
                [],
            )?;
            Err(ExtranetError::validation("stop"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|c| Ok(c.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|tx| {
            tx.execute(
                "INSERT INTO categories (name, creation_date) VALUES ('PV', 0)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .read(|c| Ok(c.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.read(|c| {
            Ok(c.execute(
                "INSERT INTO users_syndicats (user_id, syndicat_id) VALUES (99, 99)",
                [],
            )?)
        });
        assert!(matches!(result, Err(ExtranetError::Database(_))));
    }
}
