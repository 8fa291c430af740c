//! Whatsmeow-relay: HTTP and WebSocket relay for a WhatsApp Web session.
//!
//! ## Modules
//!
//! - `types` - Core types like JID, the contact/chat/message model, and events
//! - `client` - The `Messenger` trait the relay is written against
//! - `protocol` - Session-backed client and QR pairing
//! - `store` - Session persistence (local auth and in-memory)
//! - `relay` - Event wiring, HTTP endpoints and the socket channel
//! - `config` - Configuration management
//! - `state` - Persisted session state

pub mod types;
pub mod protocol;
pub mod relay;
pub mod store;

mod client;
mod config;
mod state;

pub use client::{ClientError, EventHandler, Messenger};
pub use config::RelayConfig;
pub use protocol::SessionClient;
pub use state::{DeviceKeys, SessionState};

pub use types::{normalize_chat_id, Event, JID};
