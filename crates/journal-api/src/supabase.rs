//! Pass-through client for the Supabase GoTrue auth API.
//!
//! The API never stores credentials or sessions; it forwards them and maps
//! provider responses onto the shared session DTOs.

use std::sync::Arc;

use journal_core::contract::{AuthUserDto, SessionDto};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::auth::sanitize;
use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(SessionDto),
    ConfirmationRequired,
}

#[derive(Clone)]
pub struct GoTrueClient {
    auth_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl GoTrueClient {
    pub fn new(config: &Arc<AppConfig>, client: reqwest::Client) -> Self {
        Self {
            auth_url: format!("{}/auth/v1", config.supabase_url.trim_end_matches('/')),
            anon_key: config.supabase_anon_key.clone(),
            client,
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError> {
        let payload = serde_json::json!({ "email": email, "password": password });
        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        Ok(match response.into_session()? {
            Some(session) => SignUpOutcome::SignedIn(session),
            None => SignUpOutcome::ConfirmationRequired,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionDto, AppError> {
        let payload = serde_json::json!({ "email": email, "password": password });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let response = match self.send_auth_request(request).await {
            // GoTrue reports bad credentials as 400 `invalid_grant`.
            Err(AppError::Validation(_)) => {
                return Err(AppError::unauthorized("Invalid email or password"));
            }
            other => other?,
        };
        response
            .into_session()?
            .ok_or_else(|| AppError::external("Sign-in response did not include a session"))
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        let response = request.send().await.map_err(transport_error)?;
        // An already revoked session is as good as a successful logout.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(provider_error(status, &body))
    }

    /// Ask the provider to send a password-reset email.
    pub async fn recover(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AppError> {
        let mut request = self
            .client
            .post(format!("{}/recover", self.auth_url))
            .json(&serde_json::json!({ "email": email }));
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }

        let response = self
            .public_request(request)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(provider_error(status, &body))
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(
        &self,
        request: RequestBuilder,
    ) -> Result<GoTrueAuthResponse, AppError> {
        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }
        response.json::<GoTrueAuthResponse>().await.map_err(|error| {
            AppError::external(format!("Auth response parse failed: {}", sanitize(&error)))
        })
    }
}

fn transport_error(error: reqwest::Error) -> AppError {
    AppError::external(format!("Auth provider request failed: {}", sanitize(&error)))
}

/// Client mistakes stay 4xx; provider faults become 502.
fn provider_error(status: StatusCode, body: &str) -> AppError {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::too_many_requests(message, 60),
        status if status.is_client_error() => AppError::validation(message),
        _ => AppError::external(message),
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<GoTrueUser>,
    session: Option<GoTrueSession>,
    /// Present when sign-up returns the bare user awaiting confirmation
    id: Option<String>,
    email: Option<String>,
}

impl GoTrueAuthResponse {
    fn into_session(self) -> Result<Option<SessionDto>, AppError> {
        let nested = self.session;
        let access_token = self
            .access_token
            .or_else(|| nested.as_ref().and_then(|session| session.access_token.clone()));
        let refresh_token = self
            .refresh_token
            .or_else(|| nested.as_ref().and_then(|session| session.refresh_token.clone()));
        let expires_at = self
            .expires_at
            .or_else(|| nested.as_ref().and_then(|session| session.expires_at))
            .or_else(|| {
                self.expires_in
                    .or_else(|| nested.as_ref().and_then(|session| session.expires_in))
                    .map(|expires_in| {
                        journal_core::util::unix_timestamp_now().saturating_add(expires_in)
                    })
            });
        let bare_user = self.id.map(|id| GoTrueUser {
            id,
            email: self.email,
        });
        let user = self
            .user
            .or_else(|| nested.and_then(|session| session.user))
            .or(bare_user)
            .map(|user| AuthUserDto {
                id: user.id,
                email: user.email,
            });

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(SessionDto {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AppError::external(
                "Auth response did not include enough session fields",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<GoTrueUser>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<GoTrueErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = journal_core::util::compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
