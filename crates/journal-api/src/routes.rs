use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{ConnectInfo, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use journal_core::contract::{
    paths, Ack, ApiResponse, CreateEntryRequest, CredentialsRequest, DeletedEntry,
    EntryListQuery, InsightQuery, PreferencesUpdateRequest, ProfileUpdateRequest,
    ResetPasswordRequest, SessionDto, SignUpResponse, UpdateEntryRequest,
};
use journal_core::db::{
    Database, EntryRepository, InsightRepository, PreferencesRepository, ProfileRepository,
    SqliteEntryRepository, SqliteInsightRepository, SqlitePreferencesRepository,
    SqliteProfileRepository,
};
use journal_core::models::{AiInsight, PreferencesPatch, ProfilePatch, UserPreferences, UserProfile};
use journal_core::pagination::{EntryPage, PageRequest};
use journal_core::search::SearchQuery;
use journal_core::util::{unix_millis_now, user_fingerprint};
use journal_core::validation::{validate_credentials, validate_email, EntryDraft, EntryPatch};
use journal_core::{Entry, EntryId};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthenticatedUser, SupabaseJwtVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{LimitScope, RateLimitMetricsSnapshot, RequestRateLimiter};
use crate::supabase::{GoTrueClient, SignUpOutcome};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Arc<Mutex<Database>>,
    jwt_verifier: Arc<SupabaseJwtVerifier>,
    gotrue: Arc<GoTrueClient>,
    rate_limiter: Arc<RequestRateLimiter>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: Database) -> Self {
        let client = reqwest::Client::new();
        Self {
            db: Arc::new(Mutex::new(db)),
            jwt_verifier: Arc::new(SupabaseJwtVerifier::new(config.clone(), client.clone())),
            gotrue: Arc::new(GoTrueClient::new(&config, client)),
            rate_limiter: Arc::new(RequestRateLimiter::from_config(config.as_ref())),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route(paths::AUTH_SIGNUP, post(sign_up))
        .route(paths::AUTH_LOGIN, post(log_in))
        .route(paths::AUTH_RESET_PASSWORD, post(reset_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_by_client));

    let protected_routes = Router::new()
        .route(paths::AUTH_LOGOUT, post(log_out))
        .route(paths::ENTRIES, get(list_entries).post(create_entry))
        .route(
            paths::ENTRY,
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route(paths::PROFILE, get(get_profile).put(update_profile))
        .route(
            paths::PREFERENCES,
            get(get_preferences).put(update_preferences),
        )
        .route(paths::INSIGHTS, get(list_insights))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route(paths::HEALTH, get(healthz))
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.rate_limiter.metrics_snapshot(),
    })
}

/// Verify the bearer token, then charge the caller's request budget.
///
/// Rejected tokens spend a per-address budget that is checked before any
/// verification work, so forged tokens cannot force unlimited JWKS fetches.
async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request_client_key(&request);
    state
        .rate_limiter
        .ensure_available(LimitScope::BadToken, &client)
        .await?;

    let verified = match extract_bearer_token(request.headers()) {
        Ok(token) => state.jwt_verifier.verify_access_token(token).await,
        Err(error) => Err(error),
    };
    let user = match verified {
        Ok(user) => user,
        Err(error) => {
            state
                .rate_limiter
                .record(LimitScope::BadToken, &client)
                .await;
            return Err(error);
        }
    };

    state
        .rate_limiter
        .check(LimitScope::Api, &user.user_id)
        .await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn limit_by_client(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request_client_key(&request);
    state.rate_limiter.check(LimitScope::Auth, &client).await?;
    Ok(next.run(request).await)
}

fn request_client_key(request: &Request) -> String {
    let connect_info = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_key(connect_info, request.headers())
}

/// Connection address, then the first `X-Forwarded-For` hop, then `unknown`
fn client_key(connect_info: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = connect_info {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| "unknown".to_string(), ToString::to_string)
}

async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SignUpResponse>>), AppError> {
    let Json(credentials) = payload?;
    validate_credentials(&credentials.email, &credentials.password)?;

    let outcome = state
        .gotrue
        .sign_up(credentials.email.trim(), &credentials.password)
        .await?;
    let response = match outcome {
        SignUpOutcome::SignedIn(session) => {
            tracing::info!(
                endpoint = "auth_signup",
                user = user_fingerprint(&session.user.id),
                "Signed up new user"
            );
            SignUpResponse {
                session: Some(session),
                confirmation_required: false,
            }
        }
        SignUpOutcome::ConfirmationRequired => {
            tracing::info!(endpoint = "auth_signup", "Sign-up awaiting email confirmation");
            SignUpResponse {
                session: None,
                confirmation_required: true,
            }
        }
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

async fn log_in(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<SessionDto> {
    let Json(credentials) = payload?;
    validate_credentials(&credentials.email, &credentials.password)?;

    let session = state
        .gotrue
        .sign_in(credentials.email.trim(), &credentials.password)
        .await?;
    tracing::info!(
        endpoint = "auth_login",
        user = user_fingerprint(&session.user.id),
        "Issued session"
    );
    Ok(Json(ApiResponse::ok(session)))
}

async fn log_out(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Ack> {
    state.gotrue.sign_out(&user.access_token).await?;
    tracing::info!(
        endpoint = "auth_logout",
        user = user_fingerprint(&user.user_id),
        session = user.session_id.as_deref().unwrap_or("none"),
        "Signed out"
    );
    Ok(Json(ApiResponse::ok(Ack::new("Signed out"))))
}

async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Ack> {
    let Json(request) = payload?;
    validate_email(&request.email)?;

    // The outcome is not revealed so the endpoint cannot be used to enumerate accounts.
    if let Err(error) = state
        .gotrue
        .recover(request.email.trim(), request.redirect_to.as_deref())
        .await
    {
        tracing::warn!(endpoint = "auth_reset_password", %error, "Password recovery failed");
    }
    Ok(Json(ApiResponse::ok(Ack::new(
        "If an account exists for this email, a reset link has been sent",
    ))))
}

async fn list_entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<EntryListQuery>, QueryRejection>,
) -> ApiResult<EntryPage> {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.limit, query.cursor.as_deref())?;

    let db = state.db.lock().await;
    let repo = SqliteEntryRepository::new(db.connection());
    let result = if query.has_filters() {
        let search = SearchQuery::try_from(&query)?;
        repo.search(&user.user_id, &search, &page)?
    } else {
        repo.list(&user.user_id, &page)?
    };
    Ok(Json(ApiResponse::ok(result)))
}

async fn create_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Entry>>), AppError> {
    let Json(request) = payload?;
    let draft = EntryDraft::try_from(request)?;

    let db = state.db.lock().await;
    let entry = SqliteEntryRepository::new(db.connection()).create(&user.user_id, &draft)?;
    tracing::info!(
        endpoint = "entries_create",
        user = user_fingerprint(&user.user_id),
        content_chars = entry.content.chars().count(),
        "Created entry"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}

async fn get_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Entry> {
    let id = parse_entry_id(id?)?;

    let db = state.db.lock().await;
    let entry = SqliteEntryRepository::new(db.connection())
        .get(&user.user_id, &id)?
        .ok_or_else(|| AppError::not_found(format!("entry {id} not found")))?;
    Ok(Json(ApiResponse::ok(entry)))
}

async fn update_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateEntryRequest>, JsonRejection>,
) -> ApiResult<Entry> {
    let id = parse_entry_id(id?)?;
    let Json(request) = payload?;
    let patch = EntryPatch::try_from(request)?;

    let db = state.db.lock().await;
    let entry = SqliteEntryRepository::new(db.connection()).update(&user.user_id, &id, &patch)?;
    tracing::info!(
        endpoint = "entries_update",
        user = user_fingerprint(&user.user_id),
        content_changed = patch.content.is_some(),
        mood_changed = patch.mood.is_some(),
        "Updated entry"
    );
    Ok(Json(ApiResponse::ok(entry)))
}

async fn delete_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<DeletedEntry> {
    let id = parse_entry_id(id?)?;

    let db = state.db.lock().await;
    SqliteEntryRepository::new(db.connection()).delete(&user.user_id, &id)?;
    tracing::info!(
        endpoint = "entries_delete",
        user = user_fingerprint(&user.user_id),
        "Deleted entry"
    );
    Ok(Json(ApiResponse::ok(DeletedEntry { id })))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<UserProfile> {
    let db = state.db.lock().await;
    let profile = SqliteProfileRepository::new(db.connection())
        .get(&user.user_id)?
        .ok_or_else(|| AppError::not_found("profile not found"))?;
    Ok(Json(ApiResponse::ok(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let Json(request) = payload?;
    let patch = ProfilePatch::try_from(request)?;

    let db = state.db.lock().await;
    let profile = SqliteProfileRepository::new(db.connection()).upsert(&user.user_id, &patch)?;
    Ok(Json(ApiResponse::ok(profile)))
}

async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<UserPreferences> {
    let db = state.db.lock().await;
    let preferences = SqlitePreferencesRepository::new(db.connection()).load(&user.user_id)?;
    Ok(Json(ApiResponse::ok(preferences)))
}

async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<PreferencesUpdateRequest>, JsonRejection>,
) -> ApiResult<UserPreferences> {
    let Json(request) = payload?;
    let patch = PreferencesPatch::try_from(request)?;

    let db = state.db.lock().await;
    let preferences =
        SqlitePreferencesRepository::new(db.connection()).update(&user.user_id, &patch)?;
    Ok(Json(ApiResponse::ok(preferences)))
}

async fn list_insights(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<InsightQuery>, QueryRejection>,
) -> ApiResult<Vec<AiInsight>> {
    let Query(query) = query?;
    let entry_id = query
        .entry_id
        .as_deref()
        .map(str::parse::<EntryId>)
        .transpose()
        .map_err(|_| AppError::validation("entryId: not a valid entry id"))?;

    let db = state.db.lock().await;
    let insights = SqliteInsightRepository::new(db.connection()).list_active(
        &user.user_id,
        entry_id.as_ref(),
        unix_millis_now(),
    )?;
    Ok(Json(ApiResponse::ok(insights)))
}

/// A malformed id can never name an existing entry, so it reads as missing.
fn parse_entry_id(Path(raw): Path<String>) -> Result<EntryId, AppError> {
    raw.parse::<EntryId>()
        .map_err(|_| AppError::not_found(format!("entry {raw} not found")))
}
