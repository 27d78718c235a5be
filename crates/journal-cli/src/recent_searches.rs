//! Bounded most-recent-first list of search terms.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RECENT_SEARCH_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearches {
    capacity: usize,
    terms: VecDeque<String>,
}

impl Default for RecentSearches {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECENT_SEARCH_CAPACITY)
    }
}

impl RecentSearches {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            terms: VecDeque::new(),
        }
    }

    /// Record `term` as the most recent search. Blank terms are ignored and an
    /// existing case-insensitive match moves to the front.
    pub fn push(&mut self, term: &str) -> bool {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            return false;
        }

        let folded = trimmed.to_lowercase();
        self.terms.retain(|existing| existing.to_lowercase() != folded);
        self.terms.push_front(trimmed.to_string());
        self.terms.truncate(self.capacity);
        true
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }
}
