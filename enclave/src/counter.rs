//! Durable replay counters standing in for hardware monotonic counters.
//!
//! Each counter is a single transactional row; increments commit before
//! the new value is observable, so a crash can never rewind one. The
//! essential contract is the hardware one: the value never decreases
//! across restarts, and increments are atomic with the operation they
//! guard.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use shared::{PoetError, Result};

/// The backing store for replay counters.
pub struct CounterStore {
    conn: Connection,
}

impl CounterStore {
    /// Open (or create) the counter database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| PoetError::PlatformFault(format!("failed to open counter store: {e}")))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS Counters (
                id TEXT NOT NULL PRIMARY KEY,
                value INTEGER NOT NULL
            )",
            (),
        )
        .map_err(|e| PoetError::PlatformFault(format!("failed to create counter table: {e}")))?;
        Ok(Self { conn })
    }

    /// Create a fresh counter with initial value 0 and return its id.
    pub fn create(&mut self) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO Counters (id, value) VALUES (?1, 0)",
                params![&id],
            )
            .map_err(|e| PoetError::PlatformFault(format!("failed to create counter: {e}")))?;
        Ok(id)
    }

    /// Read a counter's current value. `None` when the counter has been
    /// destroyed or never existed.
    pub fn read(&self, id: &str) -> Result<Option<u32>> {
        self.conn
            .query_row("SELECT value FROM Counters WHERE id=?1", params![id], |row| {
                row.get::<_, u32>(0)
            })
            .optional()
            .map_err(|e| PoetError::PlatformFault(format!("failed to read counter: {e}")))
    }

    /// Atomically increment a counter and return the new value.
    pub fn increment(&mut self, id: &str) -> Result<u32> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| PoetError::PlatformFault(format!("failed to start transaction: {e}")))?;
        let updated = tx
            .execute(
                "UPDATE Counters SET value = value + 1 WHERE id=?1",
                params![id],
            )
            .map_err(|e| PoetError::PlatformFault(format!("failed to increment counter: {e}")))?;
        if updated == 0 {
            return Err(PoetError::IntegrityError(
                "replay counter no longer exists".to_string(),
            ));
        }
        let value = tx
            .query_row("SELECT value FROM Counters WHERE id=?1", params![id], |row| {
                row.get::<_, u32>(0)
            })
            .map_err(|e| PoetError::PlatformFault(format!("failed to read counter: {e}")))?;
        tx.commit()
            .map_err(|e| PoetError::PlatformFault(format!("failed to commit increment: {e}")))?;
        Ok(value)
    }

    /// Number of live counters in the store.
    pub fn count(&self) -> Result<u32> {
        self.conn
            .query_row("SELECT COUNT(*) FROM Counters", (), |row| row.get(0))
            .map_err(|e| PoetError::PlatformFault(format!("failed to count counters: {e}")))
    }

    /// Destroy a counter. Used when decommissioning an identity.
    pub fn destroy(&mut self, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM Counters WHERE id=?1", params![id])
            .map_err(|e| PoetError::PlatformFault(format!("failed to destroy counter: {e}")))?;
        if deleted == 0 {
            return Err(PoetError::IntegrityError(
                "replay counter no longer exists".to_string(),
            ));
        }
        Ok(())
    }
}
