//! Filesystem locations for client state and small JSON file helpers.

use std::env;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CliError;

const SESSION_FILE: &str = "session.json";
const OFFLINE_QUEUE_FILE: &str = "offline-queue.json";
const RECENT_SEARCHES_FILE: &str = "recent-searches.json";

/// Where the client keeps its session, offline queue, and search history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `--data-dir`, then `JOURNAL_DATA_DIR`, then the platform data directory.
    pub fn resolve(cli_data_dir: Option<PathBuf>) -> Self {
        let root = cli_data_dir
            .or_else(|| env::var_os("JOURNAL_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(default_data_dir);
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    pub fn offline_queue(&self) -> PathBuf {
        self.root.join(OFFLINE_QUEUE_FILE)
    }

    pub fn recent_searches(&self) -> PathBuf {
        self.root.join(RECENT_SEARCHES_FILE)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(env::temp_dir)
        .join("journal")
}

/// Read a JSON document, `None` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CliError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Write a JSON document through a temp file so readers never see a torn write.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, serde_json::to_vec_pretty(value)?)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

pub fn remove_file(path: &Path) -> Result<(), CliError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
pub(crate) fn unique_test_dir(label: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!(
        "journal-cli-{label}-{}-{nanos}",
        std::process::id()
    ))
}
