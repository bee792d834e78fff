pub mod migrations;
pub mod queries;

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::errors::BookingError;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    init_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

pub fn init_db_with_timeout(path: &str, busy_timeout: Duration) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(busy_timeout)
        .context("failed to set busy timeout")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

pub fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, BookingError> {
    db.lock()
        .map_err(|_| BookingError::Unavailable("database lock poisoned".to_string()))
}

/// Opens a write transaction that takes SQLite's RESERVED lock up front.
///
/// Every read inside it sees committed state, and no other writer on the same
/// database file can interleave until it commits or rolls back.
pub fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>, BookingError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}
