//! Types module for WhatsApp session types.
//!
//! This module contains the core types shared by the client and the relay,
//! including JIDs, the contact/chat/message model, and event types.

mod jid;
mod events;
mod model;

pub use jid::*;
pub use events::*;
pub use model::*;
