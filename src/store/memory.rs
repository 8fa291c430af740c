//! In-memory store implementation for development and testing.

use std::sync::RwLock;

use crate::state::SessionState;
use crate::store::{SessionStore, StoreError, StoreResult};

/// Keeps the session for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<SessionState>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing session.
    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> StoreResult<SessionState> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.clone())
    }

    fn save(&self, state: &SessionState) -> StoreResult<()> {
        let mut stored = self.state.write().map_err(|_| StoreError::Poisoned)?;
        *stored = state.clone();
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut stored = self.state.write().map_err(|_| StoreError::Poisoned)?;
        *stored = SessionState::default();
        Ok(())
    }
}
