//! SQLite persistence layer for the warehouse extract.
//!
//! RULE: Only store/ talks to the database.
//! Everything else goes through store methods or the Warehouse cache.

use crate::error::IcfResult;
use rusqlite::Connection;

mod caps;
mod flows;

pub struct IcfStore {
    conn: Connection,
}

impl IcfStore {
    pub fn open(path: &str) -> IcfResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> IcfResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> IcfResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_icf_flows.sql"))?;
        Ok(())
    }
}
