use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use journal_core::contract::{
    AuthUserDto, CreateEntryRequest, CredentialsRequest, EntryListQuery, ErrorCode,
    ResetPasswordRequest, SessionDto, SignUpResponse, UpdateEntryRequest,
};
use journal_core::pagination::{Cursor, EntryPage};
use journal_core::search::SearchQuery;
use journal_core::util::unix_timestamp_now;
use journal_core::validation::{EntryPatch, MAX_CONTENT_CHARS};
use journal_core::{Entry, EntryId, Mood};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

use crate::cli::{Cli, Commands, CompletionShell};
use crate::client::{ClientError, ClientResult, JournalBackend};
use crate::commands::common::{
    entry_preview, format_relative_time, normalize_content, parse_date_bound, parse_entry_id,
    pending_notice, resolve_api_url, DateBound,
};
use crate::commands::completions::render_completions;
use crate::commands::moods::mood_items;
use crate::commands::search::{build_search_query, SearchArgs};
use crate::error::CliError;
use crate::session::{MemorySessionStore, SessionPersistence};
use crate::store::{FlushReport, JournalStore, Outcome, SearchOutcome, StoreOptions};

const USER_ID: &str = "user-1";
const TOKEN: &str = "token-user-1";

#[derive(Default)]
struct FakeState {
    entries: Vec<Entry>,
    offline: bool,
    revoked: bool,
    confirmation_required: bool,
    calls: Vec<&'static str>,
    list_delays: HashMap<String, Duration>,
    clock: i64,
}

/// In-memory stand-in for the journal API.
#[derive(Default)]
struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    fn with_entries(entries: Vec<Entry>) -> Arc<Self> {
        let backend = Self::default();
        backend.state.lock().unwrap().entries = entries;
        Arc::new(backend)
    }

    fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    fn revoke_tokens(&self) {
        self.state.lock().unwrap().revoked = true;
    }

    fn require_confirmation(&self) {
        self.state.lock().unwrap().confirmation_required = true;
    }

    fn delay_list(&self, q: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .list_delays
            .insert(q.to_string(), delay);
    }

    fn remove(&self, id: &EntryId) {
        self.state
            .lock()
            .unwrap()
            .entries
            .retain(|entry| entry.id != *id);
    }

    fn entries(&self) -> Vec<Entry> {
        self.state.lock().unwrap().entries.clone()
    }

    fn calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    /// Record the call and fail the way an unreachable server or revoked token would.
    fn begin(&self, name: &'static str, token: Option<&str>) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        state.calls.push(name);
        if let Some(token) = token {
            if state.revoked || token != TOKEN {
                return Err(ClientError::Api {
                    status: 401,
                    code: Some(ErrorCode::Unauthorized),
                    message: "invalid token".to_string(),
                });
            }
        }
        Ok(())
    }

    fn tick(state: &mut FakeState) -> i64 {
        state.clock += 1_000;
        1_700_000_000_000 + state.clock
    }
}

fn not_found() -> ClientError {
    ClientError::Api {
        status: 404,
        code: Some(ErrorCode::NotFound),
        message: "entry not found".to_string(),
    }
}

fn session() -> SessionDto {
    SessionDto {
        access_token: TOKEN.to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: unix_timestamp_now() + 3_600,
        user: AuthUserDto {
            id: USER_ID.to_string(),
            email: Some("user@example.com".to_string()),
        },
    }
}

impl JournalBackend for Arc<FakeBackend> {
    async fn sign_up(&self, _credentials: &CredentialsRequest) -> ClientResult<SignUpResponse> {
        self.begin("sign_up", None)?;
        let confirmation_required = self.state.lock().unwrap().confirmation_required;
        Ok(SignUpResponse {
            session: (!confirmation_required).then(session),
            confirmation_required,
        })
    }

    async fn sign_in(&self, credentials: &CredentialsRequest) -> ClientResult<SessionDto> {
        self.begin("sign_in", None)?;
        if credentials.password == "wrong-password" {
            return Err(ClientError::Api {
                status: 401,
                code: Some(ErrorCode::Unauthorized),
                message: "Invalid email or password".to_string(),
            });
        }
        Ok(session())
    }

    async fn sign_out(&self, access_token: &str) -> ClientResult<()> {
        self.begin("sign_out", Some(access_token))
    }

    async fn reset_password(&self, _request: &ResetPasswordRequest) -> ClientResult<()> {
        self.begin("reset_password", None)
    }

    async fn list_entries(
        &self,
        access_token: &str,
        query: &EntryListQuery,
    ) -> ClientResult<EntryPage> {
        self.begin("list", Some(access_token))?;
        let delay = query
            .q
            .as_ref()
            .and_then(|q| self.state.lock().unwrap().list_delays.get(q).copied());
        if let Some(delay) = delay {
            sleep(delay).await;
        }

        let cursor = query
            .cursor
            .as_deref()
            .map(Cursor::decode)
            .transpose()
            .map_err(|error| ClientError::Api {
                status: 400,
                code: Some(ErrorCode::ValidationError),
                message: error.to_string(),
            })?;
        let needle = query.q.as_deref().map(str::to_lowercase);

        let mut matching = self
            .entries()
            .into_iter()
            .filter(|entry| {
                needle
                    .as_deref()
                    .is_none_or(|needle| entry.content.to_lowercase().contains(needle))
            })
            .filter(|entry| {
                query
                    .mood
                    .as_deref()
                    .is_none_or(|mood| entry.mood.map(Mood::as_str) == Some(mood))
            })
            .filter(|entry| query.from.is_none_or(|from| entry.created_at >= from))
            .filter(|entry| query.to.is_none_or(|to| entry.created_at <= to))
            .filter(|entry| {
                cursor.is_none_or(|cursor| (entry.created_at, entry.id) < (cursor.created_at, cursor.id))
            })
            .collect::<Vec<_>>();
        matching.sort_by(Entry::list_order);

        let limit = query.limit.unwrap_or(20);
        let next_cursor = (matching.len() > limit)
            .then(|| Cursor::after(&matching[limit - 1]).encode());
        matching.truncate(limit);
        Ok(EntryPage {
            entries: matching,
            next_cursor,
        })
    }

    async fn get_entry(&self, access_token: &str, id: &EntryId) -> ClientResult<Entry> {
        self.begin("get", Some(access_token))?;
        self.entries()
            .into_iter()
            .find(|entry| entry.id == *id)
            .ok_or_else(not_found)
    }

    async fn create_entry(
        &self,
        access_token: &str,
        request: &CreateEntryRequest,
    ) -> ClientResult<Entry> {
        self.begin("create", Some(access_token))?;
        let mut state = self.state.lock().unwrap();
        let now = FakeBackend::tick(&mut state);
        let entry = Entry {
            created_at: now,
            updated_at: now,
            ..Entry::new(
                USER_ID,
                request.content.clone(),
                request.mood.as_deref().and_then(|mood| mood.parse().ok()),
            )
        };
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn update_entry(
        &self,
        access_token: &str,
        id: &EntryId,
        request: &UpdateEntryRequest,
    ) -> ClientResult<Entry> {
        self.begin("update", Some(access_token))?;
        let mut state = self.state.lock().unwrap();
        let now = FakeBackend::tick(&mut state);
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| entry.id == *id)
            .ok_or_else(not_found)?;
        if let Some(content) = &request.content {
            entry.content = content.clone();
        }
        if let Some(mood) = &request.mood {
            entry.mood = mood.as_deref().and_then(|mood| mood.parse().ok());
        }
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn delete_entry(&self, access_token: &str, id: &EntryId) -> ClientResult<()> {
        self.begin("delete", Some(access_token))?;
        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        state.entries.retain(|entry| entry.id != *id);
        if state.entries.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}

fn seeded_entry(created_at: i64, content: &str, mood: Option<Mood>) -> Entry {
    Entry {
        created_at,
        updated_at: created_at,
        ..Entry::new(USER_ID, content, mood)
    }
}

/// Store options without the search debounce.
fn options(page_size: usize) -> StoreOptions {
    StoreOptions {
        search_delay: Duration::ZERO,
        page_size,
        ..StoreOptions::default()
    }
}

fn store_for(
    backend: &Arc<FakeBackend>,
    sessions: MemorySessionStore,
    options: StoreOptions,
) -> JournalStore<Arc<FakeBackend>> {
    JournalStore::new(Arc::clone(backend), Box::new(sessions), options).unwrap()
}

async fn signed_in(backend: &Arc<FakeBackend>, options: StoreOptions) -> JournalStore<Arc<FakeBackend>> {
    let store = store_for(backend, MemorySessionStore::default(), options);
    store.initialize().await;
    store.sign_in("user@example.com", "password1").await.unwrap();
    store
}

struct BrokenSessions;

impl SessionPersistence for BrokenSessions {
    fn load_session(&self) -> Result<Option<SessionDto>, CliError> {
        Err(CliError::Config("session file is corrupt".to_string()))
    }

    fn save_session(&self, _session: &SessionDto) -> Result<(), CliError> {
        Ok(())
    }

    fn clear_session(&self) -> Result<(), CliError> {
        Ok(())
    }
}

#[tokio::test]
async fn initialize_restores_saved_session_once() {
    let backend = Arc::new(FakeBackend::default());
    let sessions = MemorySessionStore::default();
    sessions.save_session(&session()).unwrap();
    let store = store_for(&backend, sessions, StoreOptions::default());

    assert!(!store.auth_state().await.initialized);
    store.initialize().await;
    let auth = store.auth_state().await;
    assert!(auth.initialized);
    assert_eq!(auth.session.map(|session| session.user.id), Some(USER_ID.to_string()));

    store.sign_out().await.unwrap();
    store.initialize().await;
    assert_eq!(store.auth_state().await.session, None);
}

#[tokio::test]
async fn initialize_discards_expired_session() {
    let backend = Arc::new(FakeBackend::default());
    let sessions = MemorySessionStore::default();
    sessions
        .save_session(&SessionDto {
            expires_at: unix_timestamp_now() - 10,
            ..session()
        })
        .unwrap();
    let store = store_for(&backend, sessions, StoreOptions::default());

    store.initialize().await;
    let auth = store.auth_state().await;
    assert!(auth.initialized);
    assert_eq!(auth.session, None);
    assert_eq!(auth.error, None);
}

#[tokio::test]
async fn initialize_finishes_even_when_restore_fails() {
    let backend = Arc::new(FakeBackend::default());
    let store = JournalStore::new(
        Arc::clone(&backend),
        Box::new(BrokenSessions),
        StoreOptions::default(),
    )
    .unwrap();

    store.initialize().await;
    let auth = store.auth_state().await;
    assert!(auth.initialized);
    assert_eq!(auth.session, None);
    assert!(auth.error.unwrap().contains("corrupt"));
}

#[tokio::test]
async fn sign_in_rejection_records_error_without_session() {
    let backend = Arc::new(FakeBackend::default());
    let store = store_for(&backend, MemorySessionStore::default(), StoreOptions::default());
    store.initialize().await;

    let error = store
        .sign_in("user@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Client(ref client) if client.is_unauthorized()));

    let auth = store.auth_state().await;
    assert_eq!(auth.session, None);
    assert_eq!(
        auth.error.as_deref(),
        Some("Invalid email or password (401)")
    );
}

#[tokio::test]
async fn invalid_credentials_never_reach_the_api() {
    let backend = Arc::new(FakeBackend::default());
    let store = store_for(&backend, MemorySessionStore::default(), StoreOptions::default());

    assert!(matches!(
        store.sign_in("not-an-email", "password1").await,
        Err(CliError::Core(_))
    ));
    assert!(matches!(
        store.reset_password("  ", None).await,
        Err(CliError::Core(_))
    ));
    assert_eq!(backend.calls("sign_in"), 0);
    assert_eq!(backend.calls("reset_password"), 0);
}

#[tokio::test]
async fn sign_up_waiting_for_confirmation_stays_signed_out() {
    let backend = Arc::new(FakeBackend::default());
    backend.require_confirmation();
    let store = store_for(&backend, MemorySessionStore::default(), StoreOptions::default());

    let response = store.sign_up("new@example.com", "password1").await.unwrap();
    assert!(response.confirmation_required);
    assert_eq!(store.auth_state().await.session, None);
}

#[tokio::test]
async fn sign_out_clears_session_entries_and_history() {
    let backend = FakeBackend::with_entries(vec![seeded_entry(1_000, "hello", None)]);
    let store = signed_in(&backend, options(20)).await;
    store.load_entries().await.unwrap();
    store
        .search(SearchQuery {
            text: Some("hello".to_string()),
            ..SearchQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(store.entry_state().await.entries.len(), 1);

    store.sign_out().await.unwrap();

    assert_eq!(backend.calls("sign_out"), 1);
    assert_eq!(store.auth_state().await.session, None);
    assert!(store.entry_state().await.entries.is_empty());
    assert!(store.recent_searches().await.is_empty());
    assert!(matches!(store.load_entries().await, Err(CliError::NotSignedIn)));
}

#[tokio::test]
async fn sign_out_succeeds_while_api_is_unreachable() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;
    backend.set_offline(true);

    store.sign_out().await.unwrap();
    assert_eq!(store.auth_state().await.session, None);
}

#[tokio::test]
async fn entry_operations_require_a_session() {
    let backend = Arc::new(FakeBackend::default());
    let store = store_for(&backend, MemorySessionStore::default(), StoreOptions::default());
    store.initialize().await;

    assert!(matches!(
        store.create_entry("hello", None).await,
        Err(CliError::NotSignedIn)
    ));
    assert!(matches!(
        store.delete_entry(&EntryId::new()).await,
        Err(CliError::NotSignedIn)
    ));
    assert_eq!(backend.calls("create"), 0);
}

#[tokio::test]
async fn load_more_pages_without_duplicates() {
    let seeded = (1..=5)
        .map(|n| seeded_entry(n * 1_000, &format!("entry {n}"), None))
        .collect::<Vec<_>>();
    let backend = FakeBackend::with_entries(seeded);
    let store = signed_in(&backend, options(2)).await;

    assert_eq!(store.load_entries().await.unwrap(), 2);
    assert!(store.entry_state().await.next_cursor.is_some());
    assert_eq!(store.load_more().await.unwrap(), 2);
    assert_eq!(store.load_more().await.unwrap(), 1);
    assert_eq!(store.load_more().await.unwrap(), 0);

    let state = store.entry_state().await;
    let contents = state
        .entries
        .iter()
        .map(|entry| entry.content.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        contents,
        vec!["entry 5", "entry 4", "entry 3", "entry 2", "entry 1"]
    );
    assert_eq!(state.next_cursor, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn mutations_reconcile_the_local_list() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;

    let Outcome::Synced(first) = store.create_entry("  first  ", Some(Mood::Happy)).await.unwrap() else {
        panic!("expected synced create");
    };
    // Trimming belongs to the command layer; the store keeps what it is given.
    assert_eq!(first.content, "  first  ");
    let Outcome::Synced(second) = store.create_entry("second", None).await.unwrap() else {
        panic!("expected synced create");
    };
    let state = store.entry_state().await;
    assert_eq!(state.entries.len(), 2);
    assert_eq!(state.entries[0].id, second.id);

    let Outcome::Synced(edited) = store
        .update_entry(
            &first.id,
            EntryPatch {
                content: Some("first, edited".to_string()),
                mood: None,
            },
        )
        .await
        .unwrap()
    else {
        panic!("expected synced update");
    };
    assert_eq!(edited.mood, Some(Mood::Happy));
    assert_eq!(store.entry_state().await.entries[1].content, "first, edited");

    store.delete_entry(&second.id).await.unwrap();
    let state = store.entry_state().await;
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.entries[0].id, first.id);
}

#[tokio::test]
async fn selecting_the_current_mood_sends_nothing() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;
    let Outcome::Synced(entry) = store.create_entry("today", Some(Mood::Calm)).await.unwrap() else {
        panic!("expected synced create");
    };

    assert_eq!(store.set_mood(&entry.id, Mood::Calm).await.unwrap(), Outcome::Unchanged);
    assert_eq!(backend.calls("update"), 0);

    let Outcome::Synced(updated) = store.set_mood(&entry.id, Mood::Sad).await.unwrap() else {
        panic!("expected synced update");
    };
    assert_eq!(updated.mood, Some(Mood::Sad));

    let Outcome::Synced(cleared) = store.clear_mood(&entry.id).await.unwrap() else {
        panic!("expected synced update");
    };
    assert_eq!(cleared.mood, None);
    assert_eq!(store.clear_mood(&entry.id).await.unwrap(), Outcome::Unchanged);
    assert_eq!(backend.calls("update"), 2);
}

#[tokio::test]
async fn invalid_drafts_are_rejected_locally() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;

    assert!(matches!(
        store.create_entry("   ", None).await,
        Err(CliError::Core(_))
    ));
    assert!(matches!(
        store.create_entry(&"x".repeat(MAX_CONTENT_CHARS + 1), None).await,
        Err(CliError::Core(_))
    ));
    assert!(matches!(
        store.update_entry(&EntryId::new(), EntryPatch::default()).await,
        Err(CliError::Core(_))
    ));
    assert_eq!(backend.calls("create"), 0);
    assert_eq!(backend.calls("update"), 0);
}

#[tokio::test]
async fn deleting_twice_reports_not_found() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;
    let Outcome::Synced(entry) = store.create_entry("short-lived", None).await.unwrap() else {
        panic!("expected synced create");
    };

    assert_eq!(store.delete_entry(&entry.id).await.unwrap(), Outcome::Synced(()));
    let error = store.delete_entry(&entry.id).await.unwrap_err();
    assert!(matches!(error, CliError::Client(ref client) if client.is_not_found()));
    assert!(store.entry_state().await.error.is_some());
}

#[tokio::test]
async fn fetch_entry_merges_into_the_list() {
    let stored = seeded_entry(5_000, "remote", Some(Mood::Neutral));
    let backend = FakeBackend::with_entries(vec![stored.clone()]);
    let store = signed_in(&backend, StoreOptions::default()).await;

    assert_eq!(store.fetch_entry(&stored.id).await.unwrap(), stored);
    assert_eq!(store.entry_state().await.entries, vec![stored]);
    assert!(store.fetch_entry(&EntryId::new()).await.is_err());
}

#[tokio::test]
async fn rejected_token_ends_the_session() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;
    backend.revoke_tokens();

    let error = store.load_entries().await.unwrap_err();
    assert!(matches!(error, CliError::Client(ref client) if client.is_unauthorized()));
    assert_eq!(store.auth_state().await.session, None);
    assert!(matches!(store.load_entries().await, Err(CliError::NotSignedIn)));
}

#[tokio::test(start_paused = true)]
async fn rapid_searches_issue_one_request() {
    let backend = FakeBackend::with_entries(vec![
        seeded_entry(1_000, "a walk", None),
        seeded_entry(2_000, "about abbey road", None),
    ]);
    let store = signed_in(&backend, StoreOptions::default()).await;

    let typed = |text: &str| SearchQuery {
        text: Some(text.to_string()),
        ..SearchQuery::default()
    };
    let (first, second) = tokio::join!(store.search(typed("a")), async {
        sleep(Duration::from_millis(100)).await;
        store.search(typed("ab")).await
    });

    assert_eq!(first.unwrap(), SearchOutcome::Superseded);
    assert_eq!(second.unwrap(), SearchOutcome::Applied(1));
    assert_eq!(backend.calls("list"), 1);
    assert_eq!(store.recent_searches().await, vec!["ab".to_string()]);
    assert_eq!(store.entry_state().await.query.q.as_deref(), Some("ab"));
}

#[tokio::test(start_paused = true)]
async fn slow_stale_search_response_is_discarded() {
    let backend = FakeBackend::with_entries(vec![
        seeded_entry(1_000, "slow morning", None),
        seeded_entry(2_000, "fast evening", None),
    ]);
    backend.delay_list("slow", Duration::from_secs(1));
    let store = signed_in(&backend, StoreOptions::default()).await;

    let typed = |text: &str| SearchQuery {
        text: Some(text.to_string()),
        ..SearchQuery::default()
    };
    let (slow, fast) = tokio::join!(store.search(typed("slow")), async {
        sleep(Duration::from_millis(400)).await;
        store.search(typed("fast")).await
    });

    assert_eq!(slow.unwrap(), SearchOutcome::Superseded);
    assert_eq!(fast.unwrap(), SearchOutcome::Applied(1));
    assert_eq!(backend.calls("list"), 2);
    let state = store.entry_state().await;
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.entries[0].content, "fast evening");
}

#[tokio::test]
async fn search_filters_by_mood_and_date() {
    let backend = FakeBackend::with_entries(vec![
        seeded_entry(1_000, "early calm", Some(Mood::Calm)),
        seeded_entry(5_000, "late calm", Some(Mood::Calm)),
        seeded_entry(6_000, "late angry", Some(Mood::Angry)),
    ]);
    let store = signed_in(&backend, options(20)).await;

    let outcome = store
        .search(SearchQuery {
            text: None,
            mood: Some(Mood::Calm),
            from: Some(2_000),
            to: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Applied(1));
    assert_eq!(store.entry_state().await.entries[0].content, "late calm");
    // Mood-only searches leave no history.
    assert!(store.recent_searches().await.is_empty());

    assert!(matches!(
        store
            .search(SearchQuery {
                from: Some(9_000),
                to: Some(1_000),
                ..SearchQuery::default()
            })
            .await,
        Err(CliError::Core(_))
    ));
}

#[tokio::test]
async fn offline_create_and_edit_replay_as_one_create() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, options(20)).await;
    backend.set_offline(true);

    assert_eq!(store.create_entry("draft", None).await.unwrap(), Outcome::Queued);
    let local_id = store.entry_state().await.entries[0].id;
    assert_eq!(
        store
            .update_entry(
                &local_id,
                EntryPatch {
                    content: Some("final words".to_string()),
                    mood: Some(Some(Mood::Happy)),
                },
            )
            .await
            .unwrap(),
        Outcome::Queued
    );

    let state = store.entry_state().await;
    assert_eq!(state.pending, 1);
    assert_eq!(state.entries[0].content, "final words");
    assert_eq!(state.entries[0].mood, Some(Mood::Happy));

    backend.set_offline(false);
    let report = store.flush_pending().await.unwrap();
    assert_eq!(
        report,
        FlushReport {
            applied: 1,
            dropped: 0,
            remaining: 0
        }
    );

    let remote = backend.entries();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].content, "final words");
    assert_eq!(remote[0].mood, Some(Mood::Happy));
    assert_eq!(backend.calls("create"), 1);
    assert_eq!(backend.calls("update"), 0);

    let state = store.entry_state().await;
    assert_eq!(state.pending, 0);
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.entries[0].id, remote[0].id);
    assert_ne!(state.entries[0].id, local_id);
}

#[tokio::test]
async fn deleting_an_offline_create_leaves_nothing_to_sync() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;
    backend.set_offline(true);

    store.create_entry("never mind", None).await.unwrap();
    let local_id = store.entry_state().await.entries[0].id;
    assert_eq!(store.delete_entry(&local_id).await.unwrap(), Outcome::Synced(()));

    let state = store.entry_state().await;
    assert!(state.entries.is_empty());
    assert_eq!(state.pending, 0);

    backend.set_offline(false);
    assert_eq!(store.flush_pending().await.unwrap(), FlushReport::default());
    assert!(backend.entries().is_empty());
}

#[tokio::test]
async fn offline_placeholders_survive_a_reload() {
    let backend = FakeBackend::with_entries(vec![seeded_entry(1_000, "synced", None)]);
    let store = signed_in(&backend, StoreOptions::default()).await;
    backend.set_offline(true);
    store.create_entry("offline thought", None).await.unwrap();

    backend.set_offline(false);
    store.load_entries().await.unwrap();
    let contents = store
        .entry_state()
        .await
        .entries
        .into_iter()
        .map(|entry| entry.content)
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["offline thought".to_string(), "synced".to_string()]);
}

#[tokio::test]
async fn replay_drops_changes_to_vanished_entries() {
    let stored = seeded_entry(1_000, "soon gone", None);
    let kept = seeded_entry(2_000, "kept", None);
    let backend = FakeBackend::with_entries(vec![stored.clone(), kept.clone()]);
    let store = signed_in(&backend, StoreOptions::default()).await;
    store.load_entries().await.unwrap();

    backend.set_offline(true);
    assert_eq!(store.set_mood(&stored.id, Mood::Sad).await.unwrap(), Outcome::Queued);
    assert_eq!(store.set_mood(&kept.id, Mood::Happy).await.unwrap(), Outcome::Queued);
    assert_eq!(store.entry_state().await.pending, 2);

    backend.set_offline(false);
    backend.remove(&stored.id);
    let report = store.flush_pending().await.unwrap();
    assert_eq!(
        report,
        FlushReport {
            applied: 1,
            dropped: 1,
            remaining: 0
        }
    );
    assert_eq!(backend.entries()[0].mood, Some(Mood::Happy));
}

#[tokio::test]
async fn flush_keeps_queue_while_still_offline() {
    let backend = Arc::new(FakeBackend::default());
    let store = signed_in(&backend, StoreOptions::default()).await;
    backend.set_offline(true);

    store.create_entry("one", None).await.unwrap();
    store.create_entry("two", None).await.unwrap();
    let report = store.flush_pending().await.unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.remaining, 2);
    assert!(store.entry_state().await.error.is_some());
}

#[tokio::test]
async fn offline_delete_of_synced_entry_replays() {
    let stored = seeded_entry(1_000, "remove me", None);
    let backend = FakeBackend::with_entries(vec![stored.clone()]);
    let store = signed_in(&backend, StoreOptions::default()).await;
    store.load_entries().await.unwrap();

    backend.set_offline(true);
    assert_eq!(store.delete_entry(&stored.id).await.unwrap(), Outcome::Queued);
    assert!(store.entry_state().await.entries.is_empty());

    backend.set_offline(false);
    assert_eq!(store.flush_pending().await.unwrap().applied, 1);
    assert!(backend.entries().is_empty());
}

#[tokio::test]
async fn online_edit_lands_after_queued_edits() {
    let stored = seeded_entry(1_000, "mood swings", None);
    let backend = FakeBackend::with_entries(vec![stored.clone()]);
    let store = signed_in(&backend, StoreOptions::default()).await;
    store.load_entries().await.unwrap();

    backend.set_offline(true);
    assert_eq!(store.set_mood(&stored.id, Mood::Sad).await.unwrap(), Outcome::Queued);

    backend.set_offline(false);
    let Outcome::Synced(entry) = store.set_mood(&stored.id, Mood::Happy).await.unwrap() else {
        panic!("expected synced update");
    };
    assert_eq!(entry.mood, Some(Mood::Happy));
    assert_eq!(backend.calls("update"), 2);

    let report = store.flush_pending().await.unwrap();
    assert_eq!(report, FlushReport::default());
    assert_eq!(backend.entries()[0].mood, Some(Mood::Happy));
    assert_eq!(store.entry_state().await.entries[0].mood, Some(Mood::Happy));
}

#[tokio::test]
async fn online_delete_is_not_undone_by_queued_edits() {
    let stored = seeded_entry(1_000, "short lived", None);
    let backend = FakeBackend::with_entries(vec![stored.clone()]);
    let store = signed_in(&backend, StoreOptions::default()).await;
    store.load_entries().await.unwrap();

    backend.set_offline(true);
    store.set_mood(&stored.id, Mood::Anxious).await.unwrap();

    backend.set_offline(false);
    assert_eq!(store.delete_entry(&stored.id).await.unwrap(), Outcome::Synced(()));
    assert_eq!(backend.calls("update"), 1);

    let report = store.flush_pending().await.unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.dropped, 0);
    assert!(backend.entries().is_empty());
    assert!(store.entry_state().await.entries.is_empty());
}

#[tokio::test]
async fn edit_behind_a_stuck_queue_is_queued_in_order() {
    let stored = seeded_entry(1_000, "draft", None);
    let backend = FakeBackend::with_entries(vec![stored.clone()]);
    let store = signed_in(&backend, StoreOptions::default()).await;
    store.load_entries().await.unwrap();

    backend.set_offline(true);
    store.set_mood(&stored.id, Mood::Sad).await.unwrap();
    assert_eq!(store.set_mood(&stored.id, Mood::Calm).await.unwrap(), Outcome::Queued);
    assert_eq!(backend.calls("update"), 0);

    backend.set_offline(false);
    let report = store.flush_pending().await.unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(backend.entries()[0].mood, Some(Mood::Calm));
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn format_relative_time_buckets() {
    let now = 1_700_000_000_000;
    assert_eq!(format_relative_time(now - 10_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 86_400_000, now), "2d ago");
    assert_eq!(format_relative_time(0, now), "1970-01-01");
}

#[test]
fn entry_preview_uses_first_line_and_truncates() {
    let entry = Entry::new(USER_ID, "A   long\tfirst line here\nsecond line", None);
    assert_eq!(entry_preview(&entry, 40), "A long first line here");
    assert_eq!(entry_preview(&entry, 10), "A long ...");
}

#[test]
fn parse_entry_id_requires_full_uuid() {
    let id = EntryId::new();
    assert_eq!(parse_entry_id(&format!("  {id} ")).unwrap(), id);
    assert!(matches!(parse_entry_id("   "), Err(CliError::EmptyEntryId)));
    assert!(matches!(
        parse_entry_id("0190"),
        Err(CliError::InvalidEntryId(raw)) if raw == "0190"
    ));
}

#[test]
fn parse_date_bound_covers_whole_days() {
    assert_eq!(
        parse_date_bound("2024-03-01", DateBound::Start).unwrap(),
        1_709_251_200_000
    );
    assert_eq!(
        parse_date_bound("2024-03-01", DateBound::End).unwrap(),
        1_709_337_599_999
    );
    assert_eq!(parse_date_bound("42", DateBound::End).unwrap(), 42);
    assert!(matches!(
        parse_date_bound("03/01/2024", DateBound::Start),
        Err(CliError::InvalidDate(_))
    ));
}

#[test]
fn build_search_query_requires_a_filter() {
    let empty = SearchArgs {
        terms: &["  ".to_string()],
        mood: None,
        from: None,
        to: None,
        as_json: false,
    };
    assert!(matches!(build_search_query(&empty), Err(CliError::EmptySearch)));

    let terms = ["rainy".to_string(), "day".to_string()];
    let query = build_search_query(&SearchArgs {
        terms: &terms,
        mood: Some(Mood::Sad),
        from: Some("2024-03-01"),
        to: None,
        as_json: false,
    })
    .unwrap();
    assert_eq!(query.text.as_deref(), Some("rainy day"));
    assert_eq!(query.mood, Some(Mood::Sad));
    assert_eq!(query.from, Some(1_709_251_200_000));
}

#[test]
fn resolve_api_url_prefers_flag() {
    assert_eq!(
        resolve_api_url(Some("https://journal.example.com".to_string())),
        "https://journal.example.com"
    );
}

#[test]
fn pending_notice_pluralizes() {
    assert!(pending_notice(1).contains("1 change pending"));
    assert!(pending_notice(3).contains("3 changes pending"));
}

#[test]
fn mood_items_list_every_mood_in_order() {
    let items = mood_items();
    assert_eq!(items.len(), 6);
    assert_eq!(items[0].value, "happy");
    assert_eq!(items[5].value, "angry");

    let json = serde_json::to_value(&items[1]).unwrap();
    assert_eq!(json["value"], "calm");
    assert_eq!(json["label"], "Calm");
}

#[test]
fn completions_render_for_each_shell() {
    for shell in [CompletionShell::Bash, CompletionShell::Zsh, CompletionShell::Fish] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("journal"));
    }
}

#[test]
fn cli_parses_mood_case_insensitively() {
    let cli = Cli::try_parse_from(["journal", "add", "good", "day", "--mood", "Happy"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Add { ref content, mood: Some(Mood::Happy) } if content.len() == 2
    ));
    assert!(Cli::try_parse_from(["journal", "add", "x", "--mood", "elated"]).is_err());
}

#[test]
fn cli_rejects_mood_with_clear_mood() {
    let id = EntryId::new().to_string();
    assert!(Cli::try_parse_from([
        "journal",
        "edit",
        id.as_str(),
        "--mood",
        "calm",
        "--clear-mood"
    ])
    .is_err());
}

#[test]
fn route_classifies_commands() {
    let route = |args: &[&str]| Cli::try_parse_from(args).unwrap().command.route();
    assert_eq!(route(&["journal", "login", "--email", "a@b.co", "--password", "x"]), Some("/login"));
    assert_eq!(route(&["journal", "list"]), Some("/entries"));
    assert_eq!(route(&["journal", "history"]), Some("/search"));
    assert_eq!(route(&["journal", "moods"]), None);
}
