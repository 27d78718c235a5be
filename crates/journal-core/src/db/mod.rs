//! Database layer for Journal

mod connection;
mod entries;
mod insights;
mod migrations;
mod preferences;
mod profiles;

pub use connection::Database;
pub use entries::{EntryRepository, SqliteEntryRepository};
pub use insights::{InsightRepository, SqliteInsightRepository};
pub use preferences::{PreferencesRepository, SqlitePreferencesRepository};
pub use profiles::{ProfileRepository, SqliteProfileRepository};
