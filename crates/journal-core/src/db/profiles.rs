//! Profile repository implementation

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{ProfilePatch, UserProfile};

/// Trait for profile storage operations
pub trait ProfileRepository {
    /// Load the caller's profile, if one was ever written
    fn get(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Create or update the caller's profile
    fn upsert(&self, user_id: &str, patch: &ProfilePatch) -> Result<UserProfile>;
}

/// `SQLite` implementation of `ProfileRepository`
pub struct SqliteProfileRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteProfileRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: row.get(0)?,
            display_name: row.get(1)?,
            avatar_url: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, display_name, avatar_url, created_at, updated_at
                 FROM user_profiles WHERE id = ?",
                params![user_id],
                Self::parse_profile,
            )
            .optional()?;
        Ok(profile)
    }

    fn upsert(&self, user_id: &str, patch: &ProfilePatch) -> Result<UserProfile> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().timestamp_millis();

        let mut profile = self.get(user_id)?.unwrap_or_else(|| UserProfile {
            id: user_id.to_string(),
            display_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        });
        if let Some(display_name) = &patch.display_name {
            profile.display_name.clone_from(display_name);
        }
        if let Some(avatar_url) = &patch.avatar_url {
            profile.avatar_url.clone_from(avatar_url);
        }
        profile.updated_at = now.max(profile.updated_at);

        tx.execute(
            "INSERT INTO user_profiles (id, display_name, avatar_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
            params![
                profile.id,
                profile.display_name,
                profile.avatar_url,
                profile.created_at,
                profile.updated_at
            ],
        )?;
        tx.commit()?;

        Ok(profile)
    }
}
