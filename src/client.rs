//! The client seam the relay is written against.

use async_trait::async_trait;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::{Chat, ClientInfo, Contact, Event, Message};

/// Event handler type.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client is not ready; wait for the session to connect")]
    NotReady,
    #[error("client was already initialized")]
    AlreadyInitialized,
    #[error("chat not found: {0}")]
    ChatNotFound(String),
    #[error("invalid chat id: {0}")]
    InvalidChatId(String),
    #[error("message content is empty")]
    EmptyMessage,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("session store task failed: {0}")]
    StoreTask(#[from] tokio::task::JoinError),
}

/// A messaging session that can be driven by the relay.
///
/// Events are delivered to every registered handler, in registration order,
/// from whichever task produced them. Handlers must not block.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Register a callback receiving every event.
    fn add_event_handler(&self, handler: EventHandler);

    /// Start the session: resume it, or begin QR pairing.
    async fn initialize(&self) -> Result<(), ClientError>;

    /// Linked account details, once ready.
    async fn info(&self) -> Option<ClientInfo>;

    async fn get_contacts(&self) -> Result<Vec<Contact>, ClientError>;

    /// Chats ordered by latest activity, newest first.
    async fn get_chats(&self) -> Result<Vec<Chat>, ClientError>;

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Chat, ClientError>;

    /// The contact behind a chat; unknown chat partners get a bare contact.
    async fn get_contact_by_id(&self, contact_id: &str) -> Result<Contact, ClientError>;

    /// The last `limit` messages of a chat, oldest first.
    async fn fetch_messages(&self, chat_id: &str, limit: usize)
        -> Result<Vec<Message>, ClientError>;

    async fn send_message(&self, chat_id: &str, content: &str) -> Result<Message, ClientError>;

    /// Unlink the session and forget stored credentials.
    async fn logout(&self) -> Result<(), ClientError>;
}
