//! Search over a user's entries.
//!
//! Text matching runs on SQLite FTS5 (see the entry repository). Every filter
//! present on a [`SearchQuery`] is intersected with the others.

use std::sync::OnceLock;

use regex::Regex;

use crate::contract::EntryListQuery;
use crate::error::{Error, Result};
use crate::models::Mood;
use crate::validation::parse_mood;

/// Longest free-text query accepted, in characters
pub const MAX_QUERY_CHARS: usize = 500;

/// Combined full-text, mood, and date-range filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub mood: Option<Mood>,
    /// Inclusive lower bound on `created_at` (Unix ms)
    pub from: Option<i64>,
    /// Inclusive upper bound on `created_at` (Unix ms)
    pub to: Option<i64>,
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Check the query is well formed
    pub fn validate(&self) -> Result<()> {
        if let Some(text) = &self.text {
            if text.chars().count() > MAX_QUERY_CHARS {
                return Err(Error::validation(
                    "q",
                    format!("search text is limited to {MAX_QUERY_CHARS} characters"),
                ));
            }
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(Error::validation("from", "`from` must not be after `to`"));
            }
        }
        Ok(())
    }

    /// FTS5 expression for the text filter, `None` when there is nothing to match
    pub fn match_expression(&self) -> Option<String> {
        self.text.as_deref().and_then(fts_match_expression)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.match_expression().is_none()
            && self.mood.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }
}

impl TryFrom<&EntryListQuery> for SearchQuery {
    type Error = Error;

    fn try_from(query: &EntryListQuery) -> Result<Self> {
        let search = Self {
            text: query.q.clone(),
            mood: parse_mood(query.mood.as_deref())?,
            from: query.from,
            to: query.to,
        };
        search.validate()?;
        Ok(search)
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"[\p{L}\p{N}_]+").expect("valid token regex"))
}

/// Turn free text into an FTS5 expression that ANDs each word token.
///
/// Tokens are quoted so user punctuation can never form FTS5 syntax.
pub fn fts_match_expression(text: &str) -> Option<String> {
    let tokens = token_regex()
        .find_iter(text)
        .map(|token| format!("\"{}\"", token.as_str()))
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
