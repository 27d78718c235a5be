//! Preferences repository implementation

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{PreferencesPatch, ThemeMode, UserPreferences};

/// Trait for per-user preference storage
pub trait PreferencesRepository {
    /// Load preferences, falling back to defaults without writing a row
    fn load(&self, user_id: &str) -> Result<UserPreferences>;

    /// Apply a patch, creating the row on first write
    fn update(&self, user_id: &str, patch: &PreferencesPatch) -> Result<UserPreferences>;
}

/// `SQLite` implementation of `PreferencesRepository`
pub struct SqlitePreferencesRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePreferencesRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_preferences(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserPreferences> {
        let theme: String = row.get(4)?;
        let theme = ThemeMode::parse(&theme).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(error),
            )
        })?;
        Ok(UserPreferences {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            reminder_enabled: row.get(2)?,
            reminder_time: row.get(3)?,
            theme,
            created_at: Some(row.get(5)?),
            updated_at: Some(row.get(6)?),
        })
    }

    fn find(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let preferences = self
            .conn
            .query_row(
                "SELECT id, user_id, reminder_enabled, reminder_time, theme, created_at, updated_at
                 FROM user_preferences WHERE user_id = ?",
                params![user_id],
                Self::parse_preferences,
            )
            .optional()?;
        Ok(preferences)
    }
}

impl PreferencesRepository for SqlitePreferencesRepository<'_> {
    fn load(&self, user_id: &str) -> Result<UserPreferences> {
        Ok(self
            .find(user_id)?
            .unwrap_or_else(|| UserPreferences::defaults_for(user_id)))
    }

    fn update(&self, user_id: &str, patch: &PreferencesPatch) -> Result<UserPreferences> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().timestamp_millis();

        let mut preferences = self.load(user_id)?;
        patch.apply(&mut preferences);
        let id = preferences
            .id
            .get_or_insert_with(|| Uuid::now_v7().to_string())
            .clone();
        let created_at = *preferences.created_at.get_or_insert(now);
        preferences.updated_at = Some(now);

        tx.execute(
            "INSERT INTO user_preferences
                (id, user_id, reminder_enabled, reminder_time, theme, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                reminder_enabled = excluded.reminder_enabled,
                reminder_time = excluded.reminder_time,
                theme = excluded.theme,
                updated_at = excluded.updated_at",
            params![
                id,
                user_id,
                preferences.reminder_enabled,
                preferences.reminder_time,
                preferences.theme.as_str(),
                created_at,
                now
            ],
        )?;
        tx.commit()?;

        Ok(preferences)
    }
}
