//! Warehouse connection handling.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::schema::{SCHEMA, VIEWS};

/// The single relational store. Only the loader mutates it; dashboards and
/// BI tools read the tables and views.
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open (creating if needed) a warehouse file and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory warehouse, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(VIEWS)?;
        debug!("warehouse schema ensured");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Row count for a table or view.
    pub fn count(&self, table: &str) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}
