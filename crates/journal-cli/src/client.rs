//! HTTP client for the journal API.

use std::time::Duration;

use journal_core::contract::{
    paths, Ack, ApiResponse, CreateEntryRequest, CredentialsRequest, DeletedEntry,
    EntryListQuery, ErrorCode, ResetPasswordRequest, SessionDto, SignUpResponse,
    UpdateEntryRequest,
};
use journal_core::pagination::EntryPage;
use journal_core::util::{compact_text, is_http_url};
use journal_core::{Entry, EntryId};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response
    #[error("Could not reach the journal API: {0}")]
    Transport(String),
    #[error("{message} ({status})")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    /// The request may have reached the API but its outcome is unknown
    #[error("Request to the journal API failed: {0}")]
    Request(String),
    #[error("Unexpected API response: {0}")]
    Decode(String),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Api { status: 404, .. }
                | Self::Api {
                    code: Some(ErrorCode::NotFound),
                    ..
                }
        )
    }

    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Remote operations the client store depends on.
#[allow(async_fn_in_trait)]
pub trait JournalBackend {
    async fn sign_up(&self, credentials: &CredentialsRequest) -> ClientResult<SignUpResponse>;

    async fn sign_in(&self, credentials: &CredentialsRequest) -> ClientResult<SessionDto>;

    async fn sign_out(&self, access_token: &str) -> ClientResult<()>;

    async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<()>;

    async fn list_entries(&self, access_token: &str, query: &EntryListQuery)
        -> ClientResult<EntryPage>;

    async fn get_entry(&self, access_token: &str, id: &EntryId) -> ClientResult<Entry>;

    async fn create_entry(
        &self,
        access_token: &str,
        request: &CreateEntryRequest,
    ) -> ClientResult<Entry>;

    async fn update_entry(
        &self,
        access_token: &str,
        id: &EntryId,
        request: &UpdateEntryRequest,
    ) -> ClientResult<Entry>;

    async fn delete_entry(&self, access_token: &str, id: &EntryId) -> ClientResult<()>;
}

#[derive(Clone)]
pub struct JournalApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl JournalApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !is_http_url(trimmed) {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ClientError::Request(error.to_string()))?;

        Ok(Self {
            base_url: trimmed.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await.map_err(send_error)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ClientError::Request(error.to_string()))?;
        decode_envelope(status, &body)
    }
}

/// Only a failed connection proves the request never reached the API.
fn send_error(error: reqwest::Error) -> ClientError {
    if error.is_connect() {
        ClientError::Transport(error.to_string())
    } else {
        ClientError::Request(error.to_string())
    }
}

fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> ClientResult<T> {
    let envelope = match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(envelope) => envelope,
        Err(error) if status.is_success() => return Err(ClientError::Decode(error.to_string())),
        Err(_) => {
            let text = compact_text(body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                code: None,
                message: if text.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    text
                },
            });
        }
    };

    if envelope.success && status.is_success() {
        return envelope
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".to_string()));
    }

    Err(ClientError::Api {
        status: status.as_u16(),
        code: envelope.code,
        message: envelope
            .error
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    })
}

impl JournalBackend for JournalApiClient {
    async fn sign_up(&self, credentials: &CredentialsRequest) -> ClientResult<SignUpResponse> {
        self.send(
            self.client
                .post(self.url(paths::AUTH_SIGNUP))
                .json(credentials),
        )
        .await
    }

    async fn sign_in(&self, credentials: &CredentialsRequest) -> ClientResult<SessionDto> {
        self.send(self.client.post(self.url(paths::AUTH_LOGIN)).json(credentials))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> ClientResult<()> {
        self.send::<Ack>(
            self.client
                .post(self.url(paths::AUTH_LOGOUT))
                .bearer_auth(access_token),
        )
        .await
        .map(|_| ())
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<()> {
        self.send::<Ack>(
            self.client
                .post(self.url(paths::AUTH_RESET_PASSWORD))
                .json(request),
        )
        .await
        .map(|_| ())
    }

    async fn list_entries(
        &self,
        access_token: &str,
        query: &EntryListQuery,
    ) -> ClientResult<EntryPage> {
        self.send(
            self.client
                .get(self.url(paths::ENTRIES))
                .bearer_auth(access_token)
                .query(query),
        )
        .await
    }

    async fn get_entry(&self, access_token: &str, id: &EntryId) -> ClientResult<Entry> {
        self.send(
            self.client
                .get(self.url(&paths::entry(id)))
                .bearer_auth(access_token),
        )
        .await
    }

    async fn create_entry(
        &self,
        access_token: &str,
        request: &CreateEntryRequest,
    ) -> ClientResult<Entry> {
        self.send(
            self.client
                .post(self.url(paths::ENTRIES))
                .bearer_auth(access_token)
                .json(request),
        )
        .await
    }

    async fn update_entry(
        &self,
        access_token: &str,
        id: &EntryId,
        request: &UpdateEntryRequest,
    ) -> ClientResult<Entry> {
        self.send(
            self.client
                .put(self.url(&paths::entry(id)))
                .bearer_auth(access_token)
                .json(request),
        )
        .await
    }

    async fn delete_entry(&self, access_token: &str, id: &EntryId) -> ClientResult<()> {
        self.send::<DeletedEntry>(
            self.client
                .delete(self.url(&paths::entry(id)))
                .bearer_auth(access_token),
        )
        .await
        .map(|_| ())
    }
}
