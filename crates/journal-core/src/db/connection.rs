//! Database connection management

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

use super::migrations;

/// Database wrapper for a `SQLite` connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        tracing::debug!("Opened database at {}", path.as_ref().display());
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for a single long-lived connection
    fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases; keep the default there.
        self.conn.pragma_update(None, "journal_mode", "WAL").ok();
        self.conn.pragma_update(None, "synchronous", "NORMAL").ok();
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Remove every row owned by `user_id`.
    ///
    /// Maintenance hook for operators mirroring an account deletion made in
    /// the auth provider. No HTTP route exposes it; the API only ever acts on
    /// the caller's own rows.
    pub fn delete_user_data(&self, user_id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM ai_insights WHERE user_id = ?", params![user_id])?;
        tx.execute("DELETE FROM entries WHERE user_id = ?", params![user_id])?;
        tx.execute(
            "DELETE FROM user_preferences WHERE user_id = ?",
            params![user_id],
        )?;
        tx.execute("DELETE FROM user_profiles WHERE id = ?", params![user_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
