//! Journal entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Mood;

/// A unique identifier for an entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// A journal entry owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier
    pub id: EntryId,
    /// Owning user (auth provider subject)
    pub user_id: String,
    /// Plain text content
    pub content: String,
    /// Optional mood tag
    pub mood: Option<Mood>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Entry {
    /// Create a new entry for `user_id` stamped with the current time
    #[must_use]
    pub fn new(user_id: impl Into<String>, content: impl Into<String>, mood: Option<Mood>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: EntryId::new(),
            user_id: user_id.into(),
            content: content.into(),
            mood,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Ordering used by every list: newest first, id breaks ties.
    #[must_use]
    pub fn list_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_unique() {
        let id1 = EntryId::new();
        let id2 = EntryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entry_id_parse() {
        let id = EntryId::new();
        let parsed: EntryId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<EntryId>().is_err());
    }

    #[test]
    fn test_entry_new() {
        let entry = Entry::new("user-1", "Had a good day", Some(Mood::Happy));
        assert_eq!(entry.content, "Had a good day");
        assert_eq!(entry.mood, Some(Mood::Happy));
        assert!(entry.created_at > 0);
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn test_entry_json_is_camel_case() {
        let entry = Entry::new("user-1", "Hello", None);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("userId").is_some());
        assert!(json["mood"].is_null());
    }

    #[test]
    fn test_title_preview() {
        let entry = Entry::new("user-1", "First line\nSecond line", None);
        assert_eq!(entry.title_preview(50), "First line");
        assert_eq!(entry.title_preview(5), "First");
    }

    #[test]
    fn test_list_order_newest_first_then_id() {
        let mut older = Entry::new("u", "a", None);
        older.created_at = 1;
        let mut newer = Entry::new("u", "b", None);
        newer.created_at = 2;
        let mut tie = Entry::new("u", "c", None);
        tie.created_at = 2;

        let mut entries = vec![older.clone(), newer.clone(), tie.clone()];
        entries.sort_by(Entry::list_order);
        assert_eq!(entries[2].id, older.id);
        assert!(entries[0].id > entries[1].id);
    }
}
