//! Input validation for entry writes.
//!
//! Wire DTOs from [`crate::contract`] are converted into validated domain
//! values here; repositories only ever see validated input.

use crate::contract::{
    CreateEntryRequest, PreferencesUpdateRequest, ProfileUpdateRequest, UpdateEntryRequest,
};
use crate::error::{Error, Result};
use crate::models::{validate_reminder_time, Mood, PreferencesPatch, ProfilePatch, ThemeMode};
use crate::util::normalize_text_option;

/// Maximum entry length, counted in characters
pub const MAX_CONTENT_CHARS: usize = 50_000;
pub const MAX_DISPLAY_NAME_CHARS: usize = 100;

/// Content must be non-blank and at most [`MAX_CONTENT_CHARS`] characters
pub fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::validation("content", "content must not be empty"));
    }
    let length = content.chars().count();
    if length > MAX_CONTENT_CHARS {
        return Err(Error::validation(
            "content",
            format!("content is {length} characters; the limit is {MAX_CONTENT_CHARS}"),
        ));
    }
    Ok(())
}

/// Minimal shape check: one `@`, a non-empty local part, a dotted domain
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split('.')
                .filter(|label| !label.is_empty())
                .count()
                >= 2
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if well_formed && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(Error::validation("email", "a valid email address is required"))
    }
}

/// Credentials must carry a well-formed email and a non-blank password
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    validate_email(email)?;
    if password.trim().is_empty() {
        return Err(Error::validation("password", "password is required"));
    }
    Ok(())
}

/// Parse an optional wire mood into the closed enum
pub fn parse_mood(raw: Option<&str>) -> Result<Option<Mood>> {
    raw.map(str::parse::<Mood>).transpose()
}

/// Validated input for creating an entry. Content is stored exactly as
/// written; only blank content is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub content: String,
    pub mood: Option<Mood>,
}

impl EntryDraft {
    pub fn new(content: impl Into<String>, mood: Option<Mood>) -> Result<Self> {
        let content = content.into();
        validate_content(&content)?;
        Ok(Self { content, mood })
    }
}

impl TryFrom<CreateEntryRequest> for EntryDraft {
    type Error = Error;

    fn try_from(request: CreateEntryRequest) -> Result<Self> {
        let mood = parse_mood(request.mood.as_deref())?;
        Self::new(request.content, mood)
    }
}

/// Validated partial update; `mood: Some(None)` clears the mood
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub content: Option<String>,
    pub mood: Option<Option<Mood>>,
}

impl EntryPatch {
    pub const fn is_empty(&self) -> bool {
        self.content.is_none() && self.mood.is_none()
    }

    /// Merge the provided fields into `content`/`mood`
    pub fn apply_to(&self, content: &mut String, mood: &mut Option<Mood>) {
        if let Some(new_content) = &self.content {
            content.clone_from(new_content);
        }
        if let Some(new_mood) = self.mood {
            *mood = new_mood;
        }
    }

    /// Fold a later patch on top of this one
    #[must_use]
    pub fn merged_with(mut self, later: &Self) -> Self {
        if later.content.is_some() {
            self.content.clone_from(&later.content);
        }
        if later.mood.is_some() {
            self.mood = later.mood;
        }
        self
    }
}

impl TryFrom<UpdateEntryRequest> for EntryPatch {
    type Error = Error;

    fn try_from(request: UpdateEntryRequest) -> Result<Self> {
        if let Some(content) = &request.content {
            validate_content(content)?;
        }
        let mood = match request.mood {
            Some(raw) => Some(parse_mood(raw.as_deref())?),
            None => None,
        };
        let patch = Self {
            content: request.content,
            mood,
        };
        if patch.is_empty() {
            return Err(Error::validation(
                "body",
                "provide at least one of `content` or `mood`",
            ));
        }
        Ok(patch)
    }
}

impl From<&EntryPatch> for UpdateEntryRequest {
    fn from(patch: &EntryPatch) -> Self {
        Self {
            content: patch.content.clone(),
            mood: patch.mood.map(|mood| mood.map(|value| value.as_str().to_string())),
        }
    }
}

impl From<&EntryDraft> for CreateEntryRequest {
    fn from(draft: &EntryDraft) -> Self {
        Self {
            content: draft.content.clone(),
            mood: draft.mood.map(|mood| mood.as_str().to_string()),
        }
    }
}

impl TryFrom<ProfileUpdateRequest> for ProfilePatch {
    type Error = Error;

    fn try_from(request: ProfileUpdateRequest) -> Result<Self> {
        let display_name = request.display_name.map(normalize_text_option);
        if let Some(Some(name)) = &display_name {
            if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(Error::validation(
                    "displayName",
                    format!("display name is limited to {MAX_DISPLAY_NAME_CHARS} characters"),
                ));
            }
        }
        let avatar_url = request.avatar_url.map(normalize_text_option);
        if let Some(Some(url)) = &avatar_url {
            if !crate::util::is_http_url(url) {
                return Err(Error::validation(
                    "avatarUrl",
                    "avatar URL must start with http:// or https://",
                ));
            }
        }
        Ok(Self {
            display_name,
            avatar_url,
        })
    }
}

impl TryFrom<PreferencesUpdateRequest> for PreferencesPatch {
    type Error = Error;

    fn try_from(request: PreferencesUpdateRequest) -> Result<Self> {
        let reminder_time = request
            .reminder_time
            .as_deref()
            .map(validate_reminder_time)
            .transpose()?;
        let theme = request.theme.as_deref().map(ThemeMode::parse).transpose()?;
        let patch = Self {
            reminder_enabled: request.reminder_enabled,
            reminder_time,
            theme,
        };
        if patch.is_empty() {
            return Err(Error::validation(
                "body",
                "provide at least one of `reminderEnabled`, `reminderTime`, or `theme`",
            ));
        }
        Ok(patch)
    }
}
