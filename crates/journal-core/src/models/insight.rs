//! Cached AI insight model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntryId;

/// An externally generated annotation for a user or one of their entries.
///
/// Insights expire softly: rows past `expires_at` are hidden from reads but
/// nothing deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsight {
    pub id: String,
    pub user_id: String,
    pub insight_type: String,
    pub entry_id: Option<EntryId>,
    pub content: Value,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

impl AiInsight {
    /// Whether the insight has expired at `now_ms`
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now_ms)
    }
}
