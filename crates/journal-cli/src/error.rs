use std::io;

use thiserror::Error;

use crate::client::ClientError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] journal_core::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry content provided")]
    EmptyContent,
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("Invalid entry ID: {0}")]
    InvalidEntryId(String),
    #[error("Search needs words, --mood, --from or --to")]
    EmptySearch,
    #[error("Nothing to change; pass --content, --mood or --clear-mood")]
    EmptyEdit,
    #[error("Invalid date `{0}`; expected YYYY-MM-DD or Unix milliseconds")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `journal login` first.")]
    NotSignedIn,
    #[error("Still restoring the saved session")]
    SessionPending,
}
