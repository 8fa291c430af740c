//! Store traits for session persistence.
//!
//! These traits define the interface for storing the data the session
//! client needs to resume without pairing again.

use thiserror::Error;

use crate::state::SessionState;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize session: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to access session storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where a session is kept between runs.
pub trait SessionStore: Send + Sync {
    /// Load the stored session, or an empty one when nothing was stored.
    fn load(&self) -> StoreResult<SessionState>;

    /// Replace the stored session.
    fn save(&self, state: &SessionState) -> StoreResult<()>;

    /// Forget the stored session.
    fn clear(&self) -> StoreResult<()>;
}
