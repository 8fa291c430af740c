//! Local auth strategy: a JSON session file per client id.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::state::SessionState;
use crate::store::{SessionStore, StoreResult};

const SESSION_FILE: &str = "session.json";

/// Persists the session under `<data_path>/session[-<client_id>]/session.json`.
#[derive(Debug, Clone)]
pub struct LocalAuth {
    session_dir: PathBuf,
}

impl LocalAuth {
    pub fn new(data_path: impl AsRef<Path>, client_id: Option<&str>) -> Self {
        let dir_name = match client_id {
            Some(id) if !id.is_empty() => format!("session-{id}"),
            _ => "session".to_string(),
        };
        Self {
            session_dir: data_path.as_ref().join(dir_name),
        }
    }

    /// Directory holding the session files.
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn session_file(&self) -> PathBuf {
        self.session_dir.join(SESSION_FILE)
    }
}

impl SessionStore for LocalAuth {
    fn load(&self) -> StoreResult<SessionState> {
        match fs::read_to_string(self.session_file()) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no session at {}", self.session_file().display());
                Ok(SessionState::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, state: &SessionState) -> StoreResult<()> {
        fs::create_dir_all(&self.session_dir)?;
        let serialized = serde_json::to_string_pretty(state)?;
        // Readers must never see a partial file.
        let tmp = self.session_dir.join(format!("{SESSION_FILE}.tmp"));
        fs::write(&tmp, serialized)?;
        fs::rename(tmp, self.session_file())?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        match fs::remove_dir_all(&self.session_dir) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
