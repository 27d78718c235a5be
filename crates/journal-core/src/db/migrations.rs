//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        apply(conn, 1, MIGRATION_V1)?;
    }
    if version < 2 {
        apply(conn, 2, MIGRATION_V2)?;
    }
    if version < 3 {
        apply(conn, 3, MIGRATION_V3)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    Ok(version)
}

fn apply(conn: &Connection, version: i32, sql: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version} of {CURRENT_VERSION}");
    Ok(())
}

/// Version 1: entries and their full-text index
const MIGRATION_V1: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        content TEXT NOT NULL CHECK (length(content) BETWEEN 1 AND 50000),
        mood TEXT CHECK (
            mood IS NULL OR mood IN ('happy', 'calm', 'neutral', 'sad', 'anxious', 'angry')
        ),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_entries_user_created
        ON entries(user_id, created_at DESC, id DESC);
    CREATE INDEX IF NOT EXISTS idx_entries_user_mood ON entries(user_id, mood);

    CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
        content,
        content=entries,
        content_rowid=rowid
    );

    CREATE TRIGGER IF NOT EXISTS entries_ai AFTER INSERT ON entries BEGIN
        INSERT INTO entries_fts(rowid, content) VALUES (NEW.rowid, NEW.content);
    END;
    CREATE TRIGGER IF NOT EXISTS entries_ad AFTER DELETE ON entries BEGIN
        INSERT INTO entries_fts(entries_fts, rowid, content)
            VALUES ('delete', OLD.rowid, OLD.content);
    END;
    CREATE TRIGGER IF NOT EXISTS entries_au AFTER UPDATE OF content ON entries BEGIN
        INSERT INTO entries_fts(entries_fts, rowid, content)
            VALUES ('delete', OLD.rowid, OLD.content);
        INSERT INTO entries_fts(rowid, content) VALUES (NEW.rowid, NEW.content);
    END;
";

/// Version 2: per-user profile, preferences, and the insight cache
const MIGRATION_V2: &str = "
    CREATE TABLE IF NOT EXISTS user_profiles (
        id TEXT PRIMARY KEY,
        display_name TEXT,
        avatar_url TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_preferences (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL UNIQUE,
        reminder_enabled INTEGER NOT NULL DEFAULT 0,
        reminder_time TEXT NOT NULL DEFAULT '20:00',
        theme TEXT NOT NULL DEFAULT 'system' CHECK (theme IN ('light', 'dark', 'system')),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ai_insights (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        insight_type TEXT NOT NULL,
        entry_id TEXT REFERENCES entries(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        expires_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_ai_insights_user
        ON ai_insights(user_id, created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_ai_insights_entry ON ai_insights(entry_id);
";

/// Version 3: writes that change an entry without touching `updated_at`
/// still advance it
const MIGRATION_V3: &str = "
    CREATE TRIGGER IF NOT EXISTS entries_touch_updated_at
    AFTER UPDATE OF content, mood ON entries
    FOR EACH ROW
    WHEN NEW.updated_at = OLD.updated_at
    BEGIN
        UPDATE entries
        SET updated_at = MAX(
            OLD.updated_at + 1,
            CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
        )
        WHERE id = NEW.id;
    END;
";
