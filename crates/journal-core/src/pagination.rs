//! Keyset pagination over `(created_at DESC, id DESC)`.
//!
//! Cursors are opaque to clients: URL-safe base64 over a small JSON document
//! naming the last row of the previous page. Keyset paging keeps pages stable
//! while new entries are inserted at the head of the list.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Entry, EntryId};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Position just after the last entry of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub created_at: i64,
    pub id: EntryId,
}

impl Cursor {
    pub const fn after(entry: &Entry) -> Self {
        Self {
            created_at: entry.created_at,
            id: entry.id,
        }
    }

    pub fn encode(&self) -> String {
        // Serializing two plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|error| Error::InvalidCursor(error.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|error| Error::InvalidCursor(error.to_string()))
    }
}

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub cursor: Option<Cursor>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}

impl PageRequest {
    /// Build from raw query values, clamping the limit into `[1, MAX_PAGE_SIZE]`
    pub fn from_query(limit: Option<usize>, cursor: Option<&str>) -> Result<Self> {
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let cursor = match cursor.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(Cursor::decode(raw)?),
            None => None,
        };
        Ok(Self { limit, cursor })
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// One extra row is fetched to learn whether another page exists.
    pub(crate) const fn fetch_limit(&self) -> usize {
        self.limit + 1
    }
}

/// One page of entries plus the cursor for the next page, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub next_cursor: Option<String>,
}

impl EntryPage {
    /// Trim an over-fetched row set down to `page.limit` and derive the cursor
    pub(crate) fn from_rows(mut rows: Vec<Entry>, page: &PageRequest) -> Self {
        let has_more = rows.len() > page.limit;
        rows.truncate(page.limit);
        let next_cursor = if has_more {
            rows.last().map(|last| Cursor::after(last).encode())
        } else {
            None
        };
        Self {
            entries: rows,
            next_cursor,
        }
    }
}
