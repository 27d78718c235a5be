//! Mutations made while the API was unreachable, replayed in order later.
//!
//! The queue keeps at most one pending mutation per entry: updates to an entry
//! created offline fold into its create, repeated updates merge field by field
//! (last write wins), and a delete supersedes everything queued before it.

use std::path::PathBuf;

use journal_core::contract::{CreateEntryRequest, UpdateEntryRequest};
use journal_core::EntryId;
use serde::{Deserialize, Serialize};

use crate::error::CliError;
use crate::paths::{read_json, remove_file, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingMutation {
    Create {
        /// Placeholder id shown locally until the server assigns one
        local_id: EntryId,
        request: CreateEntryRequest,
        created_at: i64,
    },
    Update {
        id: EntryId,
        request: UpdateEntryRequest,
    },
    Delete {
        id: EntryId,
    },
}

impl PendingMutation {
    pub const fn entry_id(&self) -> &EntryId {
        match self {
            Self::Create { local_id, .. } => local_id,
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }
}

#[derive(Debug, Default)]
pub struct OfflineQueue {
    /// User whose session queued the mutations
    owner: Option<String>,
    items: Vec<PendingMutation>,
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
    owner: Option<String>,
    items: Vec<PendingMutation>,
}

impl OfflineQueue {
    /// Load a persisted queue, or start empty when no file exists yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let file: QueueFile = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            owner: file.owner,
            items: file.items,
            path: Some(path),
        })
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn items(&self) -> &[PendingMutation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn front(&self) -> Option<&PendingMutation> {
        self.items.first()
    }

    pub fn enqueue(&mut self, owner: &str, mutation: PendingMutation) -> Result<(), CliError> {
        if self.owner.as_deref() != Some(owner) {
            if !self.items.is_empty() {
                tracing::warn!(
                    discarded = self.items.len(),
                    "Offline queue belonged to another account"
                );
            }
            self.items.clear();
            self.owner = Some(owner.to_string());
        }
        match mutation {
            PendingMutation::Create { .. } => self.items.push(mutation),
            PendingMutation::Update { id, request } => self.enqueue_update(id, request),
            PendingMutation::Delete { id } => self.enqueue_delete(id),
        }
        self.persist()
    }

    fn enqueue_update(&mut self, id: EntryId, request: UpdateEntryRequest) {
        for item in &mut self.items {
            match item {
                PendingMutation::Create {
                    local_id,
                    request: create,
                    ..
                } if *local_id == id => {
                    if let Some(content) = request.content {
                        create.content = content;
                    }
                    if let Some(mood) = request.mood {
                        create.mood = mood;
                    }
                    return;
                }
                PendingMutation::Update {
                    id: queued_id,
                    request: queued,
                } if *queued_id == id => {
                    if request.content.is_some() {
                        queued.content = request.content;
                    }
                    if request.mood.is_some() {
                        queued.mood = request.mood;
                    }
                    return;
                }
                _ => {}
            }
        }
        self.items.push(PendingMutation::Update { id, request });
    }

    fn enqueue_delete(&mut self, id: EntryId) {
        let created_offline = self.items.iter().any(|item| {
            matches!(item, PendingMutation::Create { local_id, .. } if *local_id == id)
        });
        self.items.retain(|item| item.entry_id() != &id);
        if !created_offline {
            self.items.push(PendingMutation::Delete { id });
        }
    }

    /// Remove the head of the queue once it has been replayed or dropped.
    pub fn pop_front(&mut self) -> Result<Option<PendingMutation>, CliError> {
        if self.items.is_empty() {
            return Ok(None);
        }
        let mutation = self.items.remove(0);
        self.persist()?;
        Ok(Some(mutation))
    }

    pub fn clear(&mut self) -> Result<(), CliError> {
        self.items.clear();
        self.owner = None;
        self.persist()
    }

    fn persist(&self) -> Result<(), CliError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if self.items.is_empty() {
            remove_file(path)
        } else {
            write_json(
                path,
                &QueueFile {
                    owner: self.owner.clone(),
                    items: self.items.clone(),
                },
            )
        }
    }
}
