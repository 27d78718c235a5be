//! Entry repository implementation
//!
//! Every statement is scoped by `user_id`: a row owned by someone else is
//! indistinguishable from a row that does not exist.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, Mood};
use crate::pagination::{EntryPage, PageRequest};
use crate::search::SearchQuery;
use crate::validation::{EntryDraft, EntryPatch};

const ENTRY_COLUMNS: &str = "e.id, e.user_id, e.content, e.mood, e.created_at, e.updated_at";

/// Trait for entry storage operations
pub trait EntryRepository {
    /// Persist a new entry with a generated id and timestamps
    fn create(&self, user_id: &str, draft: &EntryDraft) -> Result<Entry>;

    /// Get one of the user's entries by ID
    fn get(&self, user_id: &str, id: &EntryId) -> Result<Option<Entry>>;

    /// List the user's entries, newest first
    fn list(&self, user_id: &str, page: &PageRequest) -> Result<EntryPage>;

    /// Merge the provided fields into an entry
    fn update(&self, user_id: &str, id: &EntryId, patch: &EntryPatch) -> Result<Entry>;

    /// Delete an entry; deleting a missing entry is `NotFound`
    fn delete(&self, user_id: &str, id: &EntryId) -> Result<()>;

    /// Full-text, mood, and date-range search, all filters intersected
    fn search(&self, user_id: &str, query: &SearchQuery, page: &PageRequest)
        -> Result<EntryPage>;
}

/// `SQLite` implementation of `EntryRepository`
pub struct SqliteEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
        let id: String = row.get(0)?;
        let id = id.parse::<EntryId>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error))
        })?;
        let mood: Option<String> = row.get(3)?;
        let mood = mood
            .as_deref()
            .map(str::parse::<Mood>)
            .transpose()
            .map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
            })?;
        Ok(Entry {
            id,
            user_id: row.get(1)?,
            content: row.get(2)?,
            mood,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create(&self, user_id: &str, draft: &EntryDraft) -> Result<Entry> {
        let entry = Entry::new(user_id, draft.content.clone(), draft.mood);

        self.conn.execute(
            "INSERT INTO entries (id, user_id, content, mood, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.id.as_str(),
                entry.user_id,
                entry.content,
                entry.mood.map(Mood::as_str),
                entry.created_at,
                entry.updated_at
            ],
        )?;

        Ok(entry)
    }

    fn get(&self, user_id: &str, id: &EntryId) -> Result<Option<Entry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.id = ? AND e.user_id = ?"),
                params![id.as_str(), user_id],
                Self::parse_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn list(&self, user_id: &str, page: &PageRequest) -> Result<EntryPage> {
        self.search(user_id, &SearchQuery::default(), page)
    }

    fn update(&self, user_id: &str, id: &EntryId, patch: &EntryPatch) -> Result<Entry> {
        let tx = self.conn.unchecked_transaction()?;

        let mut entry = self
            .get(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("entry {id}")))?;
        patch.apply_to(&mut entry.content, &mut entry.mood);
        // Strictly advance even when two writes land in the same millisecond.
        let now = chrono::Utc::now().timestamp_millis();
        entry.updated_at = now.max(entry.updated_at + 1);

        tx.execute(
            "UPDATE entries SET content = ?, mood = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
            params![
                entry.content,
                entry.mood.map(Mood::as_str),
                entry.updated_at,
                id.as_str(),
                user_id
            ],
        )?;
        tx.commit()?;

        Ok(entry)
    }

    fn delete(&self, user_id: &str, id: &EntryId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM entries WHERE id = ? AND user_id = ?",
            params![id.as_str(), user_id],
        )?;

        if rows == 0 {
            return Err(Error::not_found(format!("entry {id}")));
        }

        Ok(())
    }

    fn search(
        &self,
        user_id: &str,
        query: &SearchQuery,
        page: &PageRequest,
    ) -> Result<EntryPage> {
        query.validate()?;

        let mut clauses = vec!["e.user_id = ?"];
        let mut values = vec![Value::Text(user_id.to_string())];

        if let Some(expression) = query.match_expression() {
            clauses.push("e.rowid IN (SELECT rowid FROM entries_fts WHERE entries_fts MATCH ?)");
            values.push(Value::Text(expression));
        }
        if let Some(mood) = query.mood {
            clauses.push("e.mood = ?");
            values.push(Value::Text(mood.as_str().to_string()));
        }
        if let Some(from) = query.from {
            clauses.push("e.created_at >= ?");
            values.push(Value::Integer(from));
        }
        if let Some(to) = query.to {
            clauses.push("e.created_at <= ?");
            values.push(Value::Integer(to));
        }
        if let Some(cursor) = page.cursor {
            clauses.push("(e.created_at < ? OR (e.created_at = ? AND e.id < ?))");
            values.push(Value::Integer(cursor.created_at));
            values.push(Value::Integer(cursor.created_at));
            values.push(Value::Text(cursor.id.as_str()));
        }
        values.push(Value::Integer(page.fetch_limit() as i64));

        let sql = format!(
            "SELECT {ENTRY_COLUMNS}
             FROM entries e
             WHERE {}
             ORDER BY e.created_at DESC, e.id DESC
             LIMIT ?",
            clauses.join(" AND ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(EntryPage::from_rows(rows, page))
    }
}
