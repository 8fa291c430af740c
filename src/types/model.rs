//! Contacts, chats and messages as the session client models them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::JID;

/// A contact known to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: JID,
    /// Name saved in the phone's address book.
    pub name: Option<String>,
    /// Name the contact chose for themselves.
    pub push_name: Option<String>,
    /// Whether the contact is saved in the address book.
    pub is_my_contact: bool,
    pub is_group: bool,
    #[serde(default)]
    pub is_business: bool,
}

impl Contact {
    pub fn new(id: JID) -> Self {
        let is_group = id.is_group();
        Self {
            id,
            name: None,
            push_name: None,
            is_my_contact: false,
            is_group,
            is_business: false,
        }
    }

    /// Best name to show: address book name, then push name, then the number.
    pub fn display_name(&self) -> String {
        [self.name.as_deref(), self.push_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.user.clone())
    }
}

/// A conversation with a contact or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: JID,
    pub name: String,
    pub unread_count: u32,
    /// Unix seconds of the latest activity.
    pub timestamp: i64,
    pub is_group: bool,
    #[serde(default)]
    pub archived: bool,
}

impl Chat {
    pub fn new(id: JID, timestamp: i64) -> Self {
        Self {
            name: id.user.clone(),
            is_group: id.is_group(),
            id,
            unread_count: 0,
            timestamp,
            archived: false,
        }
    }
}

/// Unique key of a message within a chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    pub from_me: bool,
    pub remote: JID,
    pub id: String,
}

impl MessageKey {
    /// `<fromMe>_<remote>_<id>`, the identifier front-ends receive.
    pub fn serialized(&self) -> String {
        format!("{}_{}_{}", self.from_me, self.remote.serialized(), self.id)
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized())
    }
}

/// Kind of message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Chat,
    Image,
    Video,
    Audio,
    Ptt,
    Document,
    Sticker,
    Location,
    Vcard,
    Revoked,
    Unknown,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::Image => "image",
            MessageType::Video => "video",
            MessageType::Audio => "audio",
            MessageType::Ptt => "ptt",
            MessageType::Document => "document",
            MessageType::Sticker => "sticker",
            MessageType::Location => "location",
            MessageType::Vcard => "vcard",
            MessageType::Revoked => "revoked",
            MessageType::Unknown => "unknown",
        }
    }
}

/// Delivery state of a message, ordered from failed to played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ack {
    Error,
    Pending,
    Server,
    Device,
    Read,
    Played,
}

impl Ack {
    /// Numeric level as reported by web clients (-1 to 4).
    pub fn level(&self) -> i8 {
        match self {
            Ack::Error => -1,
            Ack::Pending => 0,
            Ack::Server => 1,
            Ack::Device => 2,
            Ack::Read => 3,
            Ack::Played => 4,
        }
    }
}

/// A single message in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageKey,
    pub from: JID,
    pub to: JID,
    pub from_me: bool,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub body: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub ack: Ack,
}

impl Message {
    /// The chat this message belongs to.
    pub fn chat_id(&self) -> &JID {
        &self.id.remote
    }
}

/// Information about the linked account, available once the session is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub wid: JID,
    pub pushname: String,
    pub platform: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_number() {
        let mut contact = Contact::new(JID::user("5511999990000"));
        assert_eq!(contact.display_name(), "5511999990000");

        contact.push_name = Some("Ana".into());
        assert_eq!(contact.display_name(), "Ana");

        contact.name = Some("Ana Souza".into());
        assert_eq!(contact.display_name(), "Ana Souza");
    }

    #[test]
    fn empty_name_is_skipped() {
        let mut contact = Contact::new(JID::user("5511999990000"));
        contact.name = Some(String::new());
        assert_eq!(contact.display_name(), "5511999990000");

        contact.push_name = Some("Ana".into());
        assert_eq!(contact.display_name(), "Ana");
    }

    #[test]
    fn message_key_serialization() {
        let key = MessageKey {
            from_me: true,
            remote: "5511999990000:3@c.us".parse().unwrap(),
            id: "3EB0ABCDEF".into(),
        };
        assert_eq!(key.serialized(), "true_5511999990000@c.us_3EB0ABCDEF");
    }

    #[test]
    fn ack_ordering_follows_levels() {
        assert!(Ack::Read > Ack::Device);
        assert!(Ack::Server < Ack::Device);
        assert_eq!(Ack::Error.level(), -1);
        assert_eq!(Ack::Played.level(), 4);
    }

    #[test]
    fn contact_for_group_is_flagged() {
        let contact = Contact::new("123-456@g.us".parse().unwrap());
        assert!(contact.is_group);
    }
}
