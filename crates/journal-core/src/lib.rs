//! journal-core - Core library for Journal
//!
//! This crate contains the shared models, wire contract, validation, search,
//! and database layer used by the API server and the client.

pub mod contract;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod search;
pub mod util;
pub mod validation;

pub use error::{Error, Result};
pub use models::{Entry, EntryId, Mood};
