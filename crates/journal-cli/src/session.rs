//! Session persistence between CLI invocations.

use std::path::PathBuf;

use journal_core::contract::SessionDto;

use crate::error::CliError;
use crate::paths::{read_json, remove_file, write_json};

pub trait SessionPersistence {
    fn load_session(&self) -> Result<Option<SessionDto>, CliError>;
    fn save_session(&self, session: &SessionDto) -> Result<(), CliError>;
    fn clear_session(&self) -> Result<(), CliError>;
}

/// Session stored as a JSON file in the client data directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionPersistence for FileSessionStore {
    fn load_session(&self) -> Result<Option<SessionDto>, CliError> {
        read_json(&self.path)
    }

    fn save_session(&self, session: &SessionDto) -> Result<(), CliError> {
        write_json(&self.path, session)?;
        restrict_permissions(&self.path)
    }

    fn clear_session(&self) -> Result<(), CliError> {
        remove_file(&self.path)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<(), CliError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<(), CliError> {
    Ok(())
}

/// Session kept only for the lifetime of the process.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: std::sync::Mutex<Option<SessionDto>>,
}

#[cfg(test)]
impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> Result<Option<SessionDto>, CliError> {
        Ok(self
            .session
            .lock()
            .map_err(|error| CliError::Config(error.to_string()))?
            .clone())
    }

    fn save_session(&self, session: &SessionDto) -> Result<(), CliError> {
        *self
            .session
            .lock()
            .map_err(|error| CliError::Config(error.to_string()))? = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), CliError> {
        *self
            .session
            .lock()
            .map_err(|error| CliError::Config(error.to_string()))? = None;
        Ok(())
    }
}
