//! Insight cache repository
//!
//! Insights are produced elsewhere; this layer only stores them and hides
//! expired rows from reads.

use rusqlite::types::Type;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{AiInsight, EntryId};

pub trait InsightRepository {
    fn insert(&self, insight: &AiInsight) -> Result<()>;

    /// Unexpired insights for the user, newest first, optionally for one entry
    fn list_active(
        &self,
        user_id: &str,
        entry_id: Option<&EntryId>,
        now_ms: i64,
    ) -> Result<Vec<AiInsight>>;
}

/// `SQLite` implementation of `InsightRepository`
pub struct SqliteInsightRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteInsightRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_insight(row: &rusqlite::Row<'_>) -> rusqlite::Result<AiInsight> {
        let entry_id: Option<String> = row.get(3)?;
        let entry_id = entry_id
            .as_deref()
            .map(str::parse::<EntryId>)
            .transpose()
            .map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
            })?;
        let content: String = row.get(4)?;
        let content = serde_json::from_str(&content).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error))
        })?;
        Ok(AiInsight {
            id: row.get(0)?,
            user_id: row.get(1)?,
            insight_type: row.get(2)?,
            entry_id,
            content,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
        })
    }
}

impl InsightRepository for SqliteInsightRepository<'_> {
    fn insert(&self, insight: &AiInsight) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ai_insights
                (id, user_id, insight_type, entry_id, content, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                insight.id,
                insight.user_id,
                insight.insight_type,
                insight.entry_id.map(|id| id.as_str()),
                serde_json::to_string(&insight.content)?,
                insight.created_at,
                insight.expires_at
            ],
        )?;
        Ok(())
    }

    fn list_active(
        &self,
        user_id: &str,
        entry_id: Option<&EntryId>,
        now_ms: i64,
    ) -> Result<Vec<AiInsight>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, insight_type, entry_id, content, created_at, expires_at
             FROM ai_insights
             WHERE user_id = ?1
               AND (?2 IS NULL OR entry_id = ?2)
               AND (expires_at IS NULL OR expires_at > ?3)
             ORDER BY created_at DESC, id DESC",
        )?;
        let insights = stmt
            .query_map(
                params![user_id, entry_id.map(EntryId::as_str), now_ms],
                Self::parse_insight,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(insights)
    }
}
