//! Client-side auth and entry state kept in step with the journal API.

use std::path::PathBuf;
use std::time::Duration;

use journal_core::contract::{
    CreateEntryRequest, CredentialsRequest, EntryListQuery, ResetPasswordRequest, SessionDto,
    SignUpResponse, UpdateEntryRequest,
};
use journal_core::models::{MoodSelection, SelectionChange};
use journal_core::pagination::DEFAULT_PAGE_SIZE;
use journal_core::search::SearchQuery;
use journal_core::util::{unix_millis_now, unix_timestamp_now, user_fingerprint};
use journal_core::validation::{validate_credentials, validate_email, EntryDraft, EntryPatch};
use journal_core::{Entry, EntryId, Mood};
use tokio::sync::Mutex;

use crate::client::{ClientError, ClientResult, JournalBackend};
use crate::debounce::{SearchCoordinator, DEFAULT_SEARCH_DEBOUNCE};
use crate::error::CliError;
use crate::offline::{OfflineQueue, PendingMutation};
use crate::paths::{read_json, write_json};
use crate::recent_searches::RecentSearches;
use crate::session::SessionPersistence;

/// Sessions this close to expiry are treated as expired.
const SESSION_EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// First session restore has finished (successfully or not)
    pub initialized: bool,
    pub session: Option<SessionDto>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryState {
    /// Newest first
    pub entries: Vec<Entry>,
    pub next_cursor: Option<String>,
    /// Filters behind the current listing; `load_more` pages through the same set
    pub query: EntryListQuery,
    #[cfg_attr(not(test), allow(dead_code))]
    pub loading: bool,
    pub error: Option<String>,
    /// Mutations waiting in the offline queue
    pub pending: usize,
}

/// Result of a mutation issued through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Accepted by the API
    Synced(T),
    /// API unreachable; applied locally and queued for `flush_pending`
    Queued,
    /// Nothing to change, no request sent
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results replaced the entry list
    Applied(usize),
    /// A newer search was issued first
    Superseded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub dropped: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub search_delay: Duration,
    pub page_size: usize,
    pub queue_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            search_delay: DEFAULT_SEARCH_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
            queue_path: None,
            history_path: None,
        }
    }
}

pub struct JournalStore<B> {
    backend: B,
    sessions: Box<dyn SessionPersistence>,
    auth: Mutex<AuthState>,
    entries: Mutex<EntryState>,
    offline: Mutex<OfflineQueue>,
    recent: Mutex<RecentSearches>,
    search: SearchCoordinator,
    history_path: Option<PathBuf>,
    page_size: usize,
}

impl<B: JournalBackend> JournalStore<B> {
    pub fn new(
        backend: B,
        sessions: Box<dyn SessionPersistence>,
        options: StoreOptions,
    ) -> Result<Self, CliError> {
        let offline = match options.queue_path {
            Some(path) => OfflineQueue::load(path)?,
            None => OfflineQueue::default(),
        };
        let recent = match &options.history_path {
            Some(path) => read_json(path)?.unwrap_or_default(),
            None => RecentSearches::default(),
        };
        let entries = EntryState {
            pending: offline.len(),
            ..EntryState::default()
        };

        Ok(Self {
            backend,
            sessions,
            auth: Mutex::new(AuthState::default()),
            entries: Mutex::new(entries),
            offline: Mutex::new(offline),
            recent: Mutex::new(recent),
            search: SearchCoordinator::new(options.search_delay),
            history_path: options.history_path,
            page_size: options.page_size.max(1),
        })
    }

    pub async fn auth_state(&self) -> AuthState {
        self.auth.lock().await.clone()
    }

    pub async fn entry_state(&self) -> EntryState {
        self.entries.lock().await.clone()
    }

    pub async fn recent_searches(&self) -> Vec<String> {
        self.recent
            .lock()
            .await
            .terms()
            .map(str::to_string)
            .collect()
    }

    /// Restore the persisted session. Only the first call does any work.
    pub async fn initialize(&self) {
        let mut auth = self.auth.lock().await;
        if auth.initialized {
            return;
        }

        match self.sessions.load_session() {
            Ok(Some(session))
                if session.is_expired(unix_timestamp_now(), SESSION_EXPIRY_SKEW_SECS) =>
            {
                tracing::info!("Stored session has expired; sign in again");
                if let Err(error) = self.sessions.clear_session() {
                    tracing::warn!("Failed to clear expired session: {error}");
                }
            }
            Ok(session) => auth.session = session,
            Err(error) => {
                tracing::warn!("Failed to restore session: {error}");
                auth.error = Some(error.to_string());
            }
        }

        auth.initialized = true;
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, CliError> {
        validate_credentials(email, password)?;
        let credentials = credentials(email, password);

        let response = match self.backend.sign_up(&credentials).await {
            Ok(response) => response,
            Err(error) => return self.auth_failure(error).await,
        };
        if let Some(session) = &response.session {
            self.establish(session.clone()).await?;
        }
        Ok(response)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionDto, CliError> {
        validate_credentials(email, password)?;
        let credentials = credentials(email, password);

        let session = match self.backend.sign_in(&credentials).await {
            Ok(session) => session,
            Err(error) => return self.auth_failure(error).await,
        };
        self.establish(session.clone()).await?;
        Ok(session)
    }

    /// End the session locally even when the API cannot be told about it.
    pub async fn sign_out(&self) -> Result<(), CliError> {
        let session = self.auth.lock().await.session.clone();
        if let Some(session) = session {
            if let Err(error) = self.backend.sign_out(&session.access_token).await {
                tracing::warn!("Remote sign-out failed, clearing local session anyway: {error}");
            }
        }

        self.sessions.clear_session()?;
        {
            let mut auth = self.auth.lock().await;
            auth.session = None;
            auth.error = None;
        }
        *self.entries.lock().await = EntryState::default();

        let mut offline = self.offline.lock().await;
        if !offline.is_empty() {
            tracing::warn!(
                pending = offline.len(),
                "Discarding offline changes on sign-out"
            );
        }
        offline.clear()?;
        drop(offline);

        let mut recent = self.recent.lock().await;
        recent.clear();
        self.persist_recent(&recent);
        Ok(())
    }

    pub async fn reset_password(
        &self,
        email: &str,
        redirect_to: Option<String>,
    ) -> Result<(), CliError> {
        validate_email(email)?;
        let request = ResetPasswordRequest {
            email: email.trim().to_string(),
            redirect_to,
        };
        match self.backend.reset_password(&request).await {
            Ok(()) => Ok(()),
            Err(error) => self.auth_failure(error).await,
        }
    }

    /// Replace the list with the first page of entries.
    pub async fn load_entries(&self) -> Result<usize, CliError> {
        let token = self.access_token().await?;
        let query = EntryListQuery {
            limit: Some(self.page_size),
            ..EntryListQuery::default()
        };
        self.entries.lock().await.loading = true;

        let page = match self.backend.list_entries(&token, &query).await {
            Ok(page) => page,
            Err(error) => return self.fail(error).await,
        };
        let placeholders = self.offline_placeholders().await?;

        let mut state = self.entries.lock().await;
        let count = page.entries.len();
        state.entries.clear();
        reconcile(&mut state.entries, page.entries);
        reconcile(&mut state.entries, placeholders);
        state.next_cursor = page.next_cursor;
        state.query = EntryListQuery::default();
        state.loading = false;
        state.error = None;
        Ok(count)
    }

    /// Append the next page of the current listing; `Ok(0)` when there is none.
    pub async fn load_more(&self) -> Result<usize, CliError> {
        let (cursor, mut query) = {
            let state = self.entries.lock().await;
            (state.next_cursor.clone(), state.query.clone())
        };
        let Some(cursor) = cursor else {
            return Ok(0);
        };
        let token = self.access_token().await?;
        query.cursor = Some(cursor);
        query.limit = Some(self.page_size);
        self.entries.lock().await.loading = true;

        let page = match self.backend.list_entries(&token, &query).await {
            Ok(page) => page,
            Err(error) => return self.fail(error).await,
        };

        let mut state = self.entries.lock().await;
        let count = page.entries.len();
        reconcile(&mut state.entries, page.entries);
        state.next_cursor = page.next_cursor;
        state.loading = false;
        state.error = None;
        Ok(count)
    }

    /// Start a plain listing at `cursor` instead of the first page.
    pub async fn load_from(&self, cursor: String) -> Result<usize, CliError> {
        {
            let mut state = self.entries.lock().await;
            state.entries.clear();
            state.query = EntryListQuery::default();
            state.next_cursor = Some(cursor);
        }
        self.load_more().await
    }

    /// Fetch one entry and merge it into the list.
    pub async fn fetch_entry(&self, id: &EntryId) -> Result<Entry, CliError> {
        let token = self.access_token().await?;
        match self.backend.get_entry(&token, id).await {
            Ok(entry) => {
                self.upsert_local(entry.clone()).await;
                Ok(entry)
            }
            Err(error) => self.fail(error).await,
        }
    }

    pub async fn create_entry(
        &self,
        content: &str,
        mood: Option<Mood>,
    ) -> Result<Outcome<Entry>, CliError> {
        let draft = EntryDraft::new(content, mood)?;
        let token = self.access_token().await?;
        let request = CreateEntryRequest::from(&draft);

        match self.backend.create_entry(&token, &request).await {
            Ok(entry) => {
                self.upsert_local(entry.clone()).await;
                Ok(Outcome::Synced(entry))
            }
            Err(error) if error.is_transport() => {
                let user_id = self.user_id().await?;
                let local = Entry::new(user_id, draft.content, draft.mood);
                tracing::info!(entry = %local.id, "API unreachable; queued new entry");
                self.queue(PendingMutation::Create {
                    local_id: local.id,
                    request,
                    created_at: local.created_at,
                })
                .await?;
                self.upsert_local(local).await;
                Ok(Outcome::Queued)
            }
            Err(error) => self.fail(error).await,
        }
    }

    pub async fn update_entry(
        &self,
        id: &EntryId,
        patch: EntryPatch,
    ) -> Result<Outcome<Entry>, CliError> {
        let request = UpdateEntryRequest::from(&patch);
        let patch = EntryPatch::try_from(request.clone())?;
        let token = self.access_token().await?;

        if self.is_offline_create(id).await || !self.drain_queued(id).await? {
            self.queue_update(id, &patch, request).await?;
            return Ok(Outcome::Queued);
        }

        match self.backend.update_entry(&token, id, &request).await {
            Ok(entry) => {
                self.upsert_local(entry.clone()).await;
                Ok(Outcome::Synced(entry))
            }
            Err(error) if error.is_transport() => {
                self.queue_update(id, &patch, request).await?;
                Ok(Outcome::Queued)
            }
            Err(error) => self.fail(error).await,
        }
    }

    /// Tag an entry with `mood`; a no-op without a request when it already has it.
    pub async fn set_mood(&self, id: &EntryId, mood: Mood) -> Result<Outcome<Entry>, CliError> {
        if let Some(current) = self.local_mood(id).await {
            if MoodSelection::new(current).select(mood) == SelectionChange::Unchanged {
                return Ok(Outcome::Unchanged);
            }
        }
        self.update_entry(
            id,
            EntryPatch {
                content: None,
                mood: Some(Some(mood)),
            },
        )
        .await
    }

    pub async fn clear_mood(&self, id: &EntryId) -> Result<Outcome<Entry>, CliError> {
        if let Some(current) = self.local_mood(id).await {
            if MoodSelection::new(current).clear() == SelectionChange::Unchanged {
                return Ok(Outcome::Unchanged);
            }
        }
        self.update_entry(
            id,
            EntryPatch {
                content: None,
                mood: Some(None),
            },
        )
        .await
    }

    pub async fn delete_entry(&self, id: &EntryId) -> Result<Outcome<()>, CliError> {
        let token = self.access_token().await?;

        // The entry never reached the server; dropping its queued create is the whole delete.
        if self.is_offline_create(id).await {
            self.queue(PendingMutation::Delete { id: *id }).await?;
            self.remove_local(id).await;
            return Ok(Outcome::Synced(()));
        }
        if !self.drain_queued(id).await? {
            tracing::info!(entry = %id, "API unreachable; queued entry delete");
            self.queue(PendingMutation::Delete { id: *id }).await?;
            self.remove_local(id).await;
            return Ok(Outcome::Queued);
        }

        match self.backend.delete_entry(&token, id).await {
            Ok(()) => {
                self.remove_local(id).await;
                Ok(Outcome::Synced(()))
            }
            Err(error) if error.is_transport() => {
                self.queue(PendingMutation::Delete { id: *id }).await?;
                self.remove_local(id).await;
                Ok(Outcome::Queued)
            }
            Err(error) => self.fail(error).await,
        }
    }

    /// Debounced search. Only the newest issued query's response is applied.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchOutcome, CliError> {
        query.validate()?;
        let ticket = self.search.issue();
        if !self.search.settle(ticket).await {
            return Ok(SearchOutcome::Superseded);
        }

        let token = self.access_token().await?;
        if let Some(text) = query.text.as_deref() {
            self.remember_search(text).await;
        }
        let list_query = list_query_for(&query, self.page_size);
        self.entries.lock().await.loading = true;

        let result = self.backend.list_entries(&token, &list_query).await;
        if !self.search.is_current(ticket) {
            tracing::debug!("Discarding stale search response");
            return Ok(SearchOutcome::Superseded);
        }

        let page = match result {
            Ok(page) => page,
            Err(error) => return self.fail(error).await,
        };
        let mut state = self.entries.lock().await;
        let count = page.entries.len();
        state.entries.clear();
        reconcile(&mut state.entries, page.entries);
        state.next_cursor = page.next_cursor;
        state.query = EntryListQuery {
            limit: None,
            ..list_query
        };
        state.loading = false;
        state.error = None;
        Ok(SearchOutcome::Applied(count))
    }

    /// Replay queued offline mutations in order, stopping at the first transport failure.
    pub async fn flush_pending(&self) -> Result<FlushReport, CliError> {
        let token = self.access_token().await?;
        let mut report = FlushReport::default();

        loop {
            let Some(mutation) = self.offline.lock().await.front().cloned() else {
                break;
            };

            match self.replay(&token, &mutation).await {
                Ok(()) => report.applied += 1,
                Err(error) if error.is_transport() => {
                    tracing::info!("API still unreachable; keeping queued changes");
                    self.entries.lock().await.error = Some(error.to_string());
                    break;
                }
                Err(error) if error.is_unauthorized() => return self.fail(error).await,
                Err(error) if error.is_not_found() => {
                    tracing::info!(
                        entry = %mutation.entry_id(),
                        "Dropping queued change for an entry that no longer exists"
                    );
                    report.dropped += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        entry = %mutation.entry_id(),
                        "Dropping queued change rejected by the API: {error}"
                    );
                    report.dropped += 1;
                }
            }
            self.offline.lock().await.pop_front()?;
        }

        report.remaining = self.offline.lock().await.len();
        self.entries.lock().await.pending = report.remaining;
        Ok(report)
    }

    async fn replay(&self, token: &str, mutation: &PendingMutation) -> ClientResult<()> {
        match mutation {
            PendingMutation::Create {
                local_id, request, ..
            } => {
                let entry = self.backend.create_entry(token, request).await?;
                self.remove_local(local_id).await;
                self.upsert_local(entry).await;
            }
            PendingMutation::Update { id, request } => {
                let entry = self.backend.update_entry(token, id, request).await?;
                self.upsert_local(entry).await;
            }
            PendingMutation::Delete { id } => {
                self.backend.delete_entry(token, id).await?;
                self.remove_local(id).await;
            }
        }
        Ok(())
    }

    async fn establish(&self, session: SessionDto) -> Result<(), CliError> {
        self.sessions.save_session(&session)?;
        tracing::info!(user = user_fingerprint(&session.user.id), "Signed in");

        let session_user = session.user.id.clone();
        let mut auth = self.auth.lock().await;
        auth.session = Some(session);
        auth.error = None;
        auth.initialized = true;
        drop(auth);

        let mut offline = self.offline.lock().await;
        if offline
            .owner()
            .is_some_and(|owner| owner != session_user.as_str())
        {
            tracing::warn!(
                discarded = offline.len(),
                "Discarding offline changes queued by another account"
            );
            offline.clear()?;
        }
        let pending = offline.len();
        drop(offline);

        *self.entries.lock().await = EntryState {
            pending,
            ..EntryState::default()
        };
        Ok(())
    }

    async fn auth_failure<T>(&self, error: ClientError) -> Result<T, CliError> {
        self.auth.lock().await.error = Some(error.to_string());
        Err(error.into())
    }

    /// Record a failed entry request; a rejected token ends the local session.
    async fn fail<T>(&self, error: ClientError) -> Result<T, CliError> {
        {
            let mut state = self.entries.lock().await;
            state.loading = false;
            state.error = Some(error.to_string());
        }
        if error.is_unauthorized() {
            tracing::info!("Session rejected by the API; signing out locally");
            if let Err(clear_error) = self.sessions.clear_session() {
                tracing::warn!("Failed to clear rejected session: {clear_error}");
            }
            self.auth.lock().await.session = None;
        }
        Err(error.into())
    }

    async fn access_token(&self) -> Result<String, CliError> {
        self.auth
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
            .ok_or(CliError::NotSignedIn)
    }

    async fn user_id(&self) -> Result<String, CliError> {
        self.auth
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.user.id.clone())
            .ok_or(CliError::NotSignedIn)
    }

    async fn queue(&self, mutation: PendingMutation) -> Result<(), CliError> {
        let owner = self.user_id().await?;
        let mut offline = self.offline.lock().await;
        offline.enqueue(&owner, mutation)?;
        let pending = offline.len();
        drop(offline);
        self.entries.lock().await.pending = pending;
        Ok(())
    }

    async fn queue_update(
        &self,
        id: &EntryId,
        patch: &EntryPatch,
        request: UpdateEntryRequest,
    ) -> Result<(), CliError> {
        tracing::info!(entry = %id, "API unreachable; queued entry update");
        self.queue(PendingMutation::Update { id: *id, request })
            .await?;

        let mut state = self.entries.lock().await;
        if let Some(entry) = state.entries.iter_mut().find(|entry| entry.id == *id) {
            patch.apply_to(&mut entry.content, &mut entry.mood);
            entry.updated_at = unix_millis_now().max(entry.updated_at + 1);
        }
        Ok(())
    }

    /// Replay queued changes for `id` so a newer direct request cannot be
    /// overwritten by them later. False when some are still queued.
    async fn drain_queued(&self, id: &EntryId) -> Result<bool, CliError> {
        if !self.has_queued(id).await {
            return Ok(true);
        }
        self.flush_pending().await?;
        Ok(!self.has_queued(id).await)
    }

    async fn has_queued(&self, id: &EntryId) -> bool {
        self.offline
            .lock()
            .await
            .items()
            .iter()
            .any(|item| item.entry_id() == id)
    }

    async fn is_offline_create(&self, id: &EntryId) -> bool {
        self.offline.lock().await.items().iter().any(|item| {
            matches!(item, PendingMutation::Create { local_id, .. } if local_id == id)
        })
    }

    /// Local stand-ins for entries created offline and not yet replayed.
    async fn offline_placeholders(&self) -> Result<Vec<Entry>, CliError> {
        let user_id = self.user_id().await?;
        let offline = self.offline.lock().await;
        Ok(offline
            .items()
            .iter()
            .filter_map(|item| match item {
                PendingMutation::Create {
                    local_id,
                    request,
                    created_at,
                } => Some(Entry {
                    id: *local_id,
                    user_id: user_id.clone(),
                    content: request.content.clone(),
                    mood: request.mood.as_deref().and_then(|mood| mood.parse().ok()),
                    created_at: *created_at,
                    updated_at: *created_at,
                }),
                _ => None,
            })
            .collect())
    }

    async fn local_mood(&self, id: &EntryId) -> Option<Option<Mood>> {
        self.entries
            .lock()
            .await
            .entries
            .iter()
            .find(|entry| entry.id == *id)
            .map(|entry| entry.mood)
    }

    async fn upsert_local(&self, entry: Entry) {
        reconcile(&mut self.entries.lock().await.entries, vec![entry]);
    }

    async fn remove_local(&self, id: &EntryId) {
        self.entries
            .lock()
            .await
            .entries
            .retain(|entry| entry.id != *id);
    }

    async fn remember_search(&self, text: &str) {
        let mut recent = self.recent.lock().await;
        if recent.push(text) {
            self.persist_recent(&recent);
        }
    }

    fn persist_recent(&self, recent: &RecentSearches) {
        let Some(path) = &self.history_path else {
            return;
        };
        if let Err(error) = write_json(path, recent) {
            tracing::warn!("Failed to save recent searches: {error}");
        }
    }
}

fn credentials(email: &str, password: &str) -> CredentialsRequest {
    CredentialsRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    }
}

fn list_query_for(query: &SearchQuery, page_size: usize) -> EntryListQuery {
    EntryListQuery {
        limit: Some(page_size),
        cursor: None,
        q: query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        mood: query.mood.map(|mood| mood.as_str().to_string()),
        from: query.from,
        to: query.to,
    }
}

/// Merge `incoming` into `entries`, replacing same-id rows and keeping list order.
pub fn reconcile(entries: &mut Vec<Entry>, incoming: Vec<Entry>) {
    for entry in incoming {
        if let Some(existing) = entries.iter_mut().find(|existing| existing.id == entry.id) {
            *existing = entry;
        } else {
            entries.push(entry);
        }
    }
    entries.sort_by(Entry::list_order);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: i64, content: &str) -> Entry {
        Entry {
            created_at,
            updated_at: created_at,
            ..Entry::new("user-1", content, None)
        }
    }

    #[test]
    fn reconcile_dedups_and_orders_newest_first() {
        let older = entry(1_000, "older");
        let newer = entry(2_000, "newer");
        let mut entries = vec![older.clone()];

        let mut edited = older.clone();
        edited.content = "edited".to_string();
        reconcile(&mut entries, vec![newer.clone(), edited]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, newer.id);
        assert_eq!(entries[1].content, "edited");
    }

    #[test]
    fn list_query_drops_blank_text() {
        let query = SearchQuery {
            text: Some("   ".to_string()),
            mood: Some(Mood::Calm),
            ..SearchQuery::default()
        };
        let list_query = list_query_for(&query, 5);
        assert_eq!(list_query.q, None);
        assert_eq!(list_query.mood.as_deref(), Some("calm"));
        assert_eq!(list_query.limit, Some(5));
    }
}
