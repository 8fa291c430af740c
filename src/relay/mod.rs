//! HTTP and WebSocket relay in front of a [`Messenger`].
//!
//! The relay keeps a small view of the session (status, QR, account name),
//! re-broadcasts client events to every open socket and exposes the client's
//! contacts, chats and messages as JSON.

pub mod dto;
pub mod events;
mod error;
pub mod routes;
pub mod state;
mod ws;

use std::future::Future;
use std::sync::Arc;

use log::info;
use tokio::net::TcpListener;

use crate::client::Messenger;
use crate::config::RelayConfig;

pub use error::ApiError;
pub use events::register_event_handlers;
pub use routes::router;
pub use state::{ConnectionStatus, RelayState, SessionView};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
    #[error(transparent)]
    Client(#[from] crate::client::ClientError),
}

/// Serve the relay until `shutdown` resolves.
///
/// The listener is bound before the client starts.
pub async fn run(
    config: RelayConfig,
    messenger: Arc<dyn Messenger>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), RelayError> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Server running on {addr}");

    let relay = RelayState::new(messenger.clone(), config);
    register_event_handlers(&relay);
    let app = router(relay);

    info!("starting WhatsApp session");
    messenger.initialize().await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
