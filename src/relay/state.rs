//! Shared state behind the HTTP and WebSocket handlers.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::client::Messenger;
use crate::config::RelayConfig;
use crate::relay::dto::Frame;
use crate::types::ClientInfo;

/// Frames buffered per socket before a slow socket starts skipping.
const BROADCAST_CAPACITY: usize = 256;

/// Connection status reported to front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    QrRequired,
    Connected,
}

/// What the relay currently knows about the session.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub status: ConnectionStatus,
    /// Latest QR code as an image data URL.
    pub qr: Option<String>,
    pub info: Option<ClientInfo>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            qr: None,
            info: None,
        }
    }
}

pub struct RelayState {
    pub messenger: Arc<dyn Messenger>,
    pub config: RelayConfig,
    view: RwLock<SessionView>,
    frames: broadcast::Sender<String>,
}

impl RelayState {
    pub fn new(messenger: Arc<dyn Messenger>, config: RelayConfig) -> Arc<Self> {
        let (frames, _) = broadcast::channel(BROADCAST_CAPACITY);
        Arc::new(Self {
            messenger,
            config,
            view: RwLock::new(SessionView::default()),
            frames,
        })
    }

    /// Snapshot of the session view.
    pub fn view(&self) -> SessionView {
        match self.view.read() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply a change to the session view.
    pub fn update_view(&self, apply: impl FnOnce(&mut SessionView)) {
        let mut view = match self.view.write() {
            Ok(view) => view,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut *view);
    }

    /// Send a frame to every open socket.
    pub fn broadcast(&self, frame: &Frame) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to encode frame: {err}");
                return;
            }
        };
        match self.frames.send(text) {
            Ok(sockets) => debug!("frame sent to {sockets} socket(s)"),
            Err(_) => debug!("no open sockets; frame dropped"),
        }
    }

    /// Receive every frame broadcast from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.frames.subscribe()
    }

    /// Number of open sockets.
    pub fn socket_count(&self) -> usize {
        self.frames.receiver_count()
    }
}
