//! User preferences model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Theme mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
    /// Follow system preference
    #[default]
    System,
}

impl ThemeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(Error::validation(
                "theme",
                format!("`{other}` is not a theme; expected light, dark, or system"),
            )),
        }
    }
}

/// Per-user settings, created lazily on first update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Row id; `None` until the preferences are first persisted
    pub id: Option<String>,
    pub user_id: String,
    /// Whether a daily writing reminder is sent
    pub reminder_enabled: bool,
    /// Reminder time as `HH:MM` (24h)
    pub reminder_time: String,
    pub theme: ThemeMode,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl UserPreferences {
    /// Defaults returned for a user who never saved preferences
    #[must_use]
    pub fn defaults_for(user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            reminder_enabled: false,
            reminder_time: "20:00".to_string(),
            theme: ThemeMode::System,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update for preferences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub reminder_enabled: Option<bool>,
    pub reminder_time: Option<String>,
    pub theme: Option<ThemeMode>,
}

impl PreferencesPatch {
    pub const fn is_empty(&self) -> bool {
        self.reminder_enabled.is_none() && self.reminder_time.is_none() && self.theme.is_none()
    }

    pub fn apply(&self, preferences: &mut UserPreferences) {
        if let Some(enabled) = self.reminder_enabled {
            preferences.reminder_enabled = enabled;
        }
        if let Some(time) = &self.reminder_time {
            preferences.reminder_time.clone_from(time);
        }
        if let Some(theme) = self.theme {
            preferences.theme = theme;
        }
    }
}

/// Validate and normalize a `HH:MM` reminder time
pub fn validate_reminder_time(value: &str) -> Result<String> {
    chrono::NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| {
            Error::validation("reminderTime", "reminder time must be HH:MM in 24h format")
        })
}
