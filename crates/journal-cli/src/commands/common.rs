use std::env;
use std::io::{self, IsTerminal, Read};

use chrono::{NaiveDate, NaiveTime, Utc};
use journal_core::{Entry, EntryId, Mood};
use serde::Serialize;

use crate::client::DEFAULT_API_URL;
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryListItem {
    pub id: String,
    pub preview: String,
    pub content: String,
    pub mood: Option<Mood>,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// `--api-url`, then `JOURNAL_API_URL`, then the local default.
pub fn resolve_api_url(cli_api_url: Option<String>) -> String {
    cli_api_url
        .or_else(|| env::var("JOURNAL_API_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

pub fn parse_entry_id(raw: &str) -> Result<EntryId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyEntryId);
    }
    trimmed
        .parse::<EntryId>()
        .map_err(|_| CliError::InvalidEntryId(trimmed.to_string()))
}

/// Accept a calendar date (whole UTC day) or raw Unix milliseconds.
pub fn parse_date_bound(raw: &str, bound: DateBound) -> Result<i64, CliError> {
    let trimmed = raw.trim();
    if let Ok(millis) = trimmed.parse::<i64>() {
        return Ok(millis);
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(trimmed.to_string()))?;
    let time = match bound {
        DateBound::Start => NaiveTime::MIN,
        DateBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(|| CliError::InvalidDate(trimmed.to_string()))?,
    };
    Ok(date.and_time(time).and_utc().timestamp_millis())
}

pub fn resolve_entry_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }
    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }
    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|entry| {
            let id = entry.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let preview = entry_preview(entry, 40);
            let relative_time = format_relative_time(entry.created_at, now_ms);
            let mood = entry
                .mood
                .map_or_else(String::new, |mood| mood.presentation().emoji.to_string());

            format!("{short_id:<13}  {mood:<2}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn format_entry_detail(entry: &Entry) -> String {
    let mood = entry.mood.map_or_else(
        || "none".to_string(),
        |mood| {
            let presentation = mood.presentation();
            format!("{} {}", presentation.emoji, presentation.label)
        },
    );
    format!(
        "id:      {}\ncreated: {}\nupdated: {}\nmood:    {}\n\n{}",
        entry.id,
        format_timestamp(entry.created_at),
        format_timestamp(entry.updated_at),
        mood,
        entry.content
    )
}

pub fn entry_to_list_item(entry: &Entry) -> EntryListItem {
    let now_ms = Utc::now().timestamp_millis();
    EntryListItem {
        id: entry.id.to_string(),
        preview: entry_preview(entry, 80),
        content: entry.content.clone(),
        mood: entry.mood,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
        relative_time: format_relative_time(entry.created_at, now_ms),
    }
}

pub fn print_entries(entries: &[Entry], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if entries.is_empty() {
        println!("No entries");
    } else {
        for line in format_entry_lines(entries) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn entry_preview(entry: &Entry, max_chars: usize) -> String {
    let first_line = entry.title_preview(usize::MAX);
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;

    let diff = now_ms.saturating_sub(timestamp_ms);
    if diff < MINUTE {
        "just now".to_string()
    } else if diff < HOUR {
        format!("{}m ago", diff / MINUTE)
    } else if diff < DAY {
        format!("{}h ago", diff / HOUR)
    } else if diff < WEEK {
        format!("{}d ago", diff / DAY)
    } else {
        format_timestamp(timestamp_ms)
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

pub fn pending_notice(pending: usize) -> String {
    format!(
        "Saved offline ({pending} change{} pending). Run `journal sync` once the API is reachable.",
        if pending == 1 { "" } else { "s" }
    )
}
