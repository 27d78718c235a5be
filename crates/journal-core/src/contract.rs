//! Wire contract shared by the API server and its clients.
//!
//! Endpoint paths, the JSON response envelope, and request/response DTOs live
//! here so both sides of the HTTP boundary stay in sync.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::EntryId;

/// HTTP endpoint paths.
pub mod paths {
    use crate::models::EntryId;

    pub const HEALTH: &str = "/healthz";
    pub const AUTH_SIGNUP: &str = "/auth/signup";
    pub const AUTH_LOGIN: &str = "/auth/login";
    pub const AUTH_LOGOUT: &str = "/auth/logout";
    pub const AUTH_RESET_PASSWORD: &str = "/auth/reset-password";
    pub const ENTRIES: &str = "/entries";
    /// Route pattern for a single entry (axum path syntax)
    pub const ENTRY: &str = "/entries/{id}";
    pub const PROFILE: &str = "/profile";
    pub const PREFERENCES: &str = "/preferences";
    pub const INSIGHTS: &str = "/insights";

    /// Concrete path for one entry
    pub fn entry(id: &EntryId) -> String {
        format!("{ENTRIES}/{id}")
    }
}

/// Machine-readable failure category carried in the envelope's `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    UpstreamError,
    InternalError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::UpstreamError => "upstream_error",
            Self::InternalError => "internal_error",
        }
    }
}

/// `{ success, data?, error?, code? }` envelope returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(error: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code),
        }
    }
}

/// Body of `POST /entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

/// Body of `PUT /entries/{id}`; only provided fields are merged.
///
/// `mood: null` clears the mood, an absent `mood` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub mood: Option<Option<String>>,
}

/// Query string of `GET /entries`. Any of `q`, `mood`, `from`, `to` turns
/// the listing into a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Inclusive lower bound on `createdAt` (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    /// Inclusive upper bound on `createdAt` (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
}

impl EntryListQuery {
    pub const fn has_filters(&self) -> bool {
        self.q.is_some() || self.mood.is_some() || self.from.is_some() || self.to.is_some()
    }
}

/// Body of `POST /auth/signup` and `POST /auth/login`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for CredentialsRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/reset-password`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUserDto {
    pub id: String,
    pub email: Option<String>,
}

/// Session handed to clients after sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: AuthUserDto,
}

impl SessionDto {
    /// Expired, or expiring within `skew_secs`
    #[must_use]
    pub fn is_expired(&self, now_secs: i64, skew_secs: i64) -> bool {
        self.expires_at <= now_secs.saturating_add(skew_secs)
    }
}

impl fmt::Debug for SessionDto {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionDto")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of `POST /auth/signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDto>,
    pub confirmation_required: bool,
}

/// Plain acknowledgement for endpoints with nothing else to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of `DELETE /entries/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEntry {
    pub id: EntryId,
}

/// Body of `PUT /profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<Option<String>>,
}

/// Body of `PUT /preferences`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

/// Query string of `GET /insights`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true, "data": 1 }));

        let failed =
            serde_json::to_value(ApiResponse::<()>::failure("nope", ErrorCode::NotFound)).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({ "success": false, "error": "nope", "code": "not_found" })
        );
    }

    #[test]
    fn failure_envelope_decodes_for_any_payload_type() {
        let raw = r#"{"success":false,"error":"entry not found","code":"not_found"}"#;
        let parsed: ApiResponse<DeletedEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data, None);
        assert_eq!(parsed.code, Some(ErrorCode::NotFound));
    }

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let absent: UpdateEntryRequest = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert_eq!(absent.mood, None);

        let cleared: UpdateEntryRequest = serde_json::from_str(r#"{"mood":null}"#).unwrap();
        assert_eq!(cleared.mood, Some(None));

        let set: UpdateEntryRequest = serde_json::from_str(r#"{"mood":"calm"}"#).unwrap();
        assert_eq!(set.mood, Some(Some("calm".to_string())));
    }

    #[test]
    fn update_request_serializes_clear_as_null() {
        let request = UpdateEntryRequest {
            content: None,
            mood: Some(None),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "mood": null })
        );
    }

    #[test]
    fn list_query_detects_filters() {
        assert!(!EntryListQuery::default().has_filters());
        let query = EntryListQuery {
            mood: Some("sad".to_string()),
            ..EntryListQuery::default()
        };
        assert!(query.has_filters());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let request = CredentialsRequest {
            email: "a@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn entry_path_formats_id() {
        let id = EntryId::new();
        assert_eq!(paths::entry(&id), format!("/entries/{id}"));
    }
}
