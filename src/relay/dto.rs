//! JSON shapes handed to front-ends.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::types::{Ack, Chat, Contact, Message};

/// Timestamps go out as ISO-8601 with millisecond precision.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

fn from_unix(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}

/// Status every relayed contact carries.
const ACTIVE: &str = "active";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDto {
    pub id: String,
    pub phone: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,
    pub status: &'static str,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl ContactDto {
    pub fn from_contact(contact: &Contact, now: DateTime<Utc>) -> Self {
        Self {
            id: contact.id.serialized(),
            phone: contact.id.user.clone(),
            name: contact.display_name(),
            push_name: contact.push_name.clone(),
            status: ACTIVE,
            created_at: now,
            updated_at: now,
        }
    }

    /// Contact as embedded in a conversation, without the push name.
    pub fn embedded(contact: &Contact, now: DateTime<Utc>) -> Self {
        Self {
            push_name: None,
            ..Self::from_contact(contact, now)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub id: String,
    pub contact: ContactDto,
    pub unread_count: u32,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl ConversationDto {
    pub fn new(chat: &Chat, contact: &Contact, now: DateTime<Utc>) -> Self {
        Self {
            id: chat.id.serialized(),
            contact: ContactDto::embedded(contact, now),
            unread_count: chat.unread_count,
            updated_at: from_unix(chat.timestamp),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    /// The chat the message belongs to, for sent and received messages alike.
    pub conversation_id: String,
    pub from_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
}

impl MessageDto {
    /// A message from a chat's history.
    pub fn from_history(message: &Message) -> Self {
        let contact_id = if message.from_me {
            "me".to_string()
        } else {
            message.from.serialized()
        };
        let status = if message.ack >= Ack::Device { "read" } else { "sent" };
        Self {
            id: message.id.serialized(),
            conversation_id: message.chat_id().serialized(),
            from_me: message.from_me,
            contact_id: Some(contact_id),
            kind: message.kind.as_str().to_string(),
            content: message.body.clone(),
            timestamp: from_unix(message.timestamp),
            status,
        }
    }

    /// A message that just arrived.
    pub fn inbound(message: &Message) -> Self {
        Self {
            contact_id: Some(message.from.serialized()),
            status: "received",
            ..Self::from_history(message)
        }
    }

    /// Confirmation of a message sent through the API.
    pub fn sent(message: &Message, conversation_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: message.id.serialized(),
            conversation_id,
            from_me: true,
            contact_id: None,
            kind: "text".to_string(),
            content: message.body.clone(),
            timestamp: now,
            status: "sent",
        }
    }
}

/// Frames pushed over the socket channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Qr { qr: String },
    Authenticated,
    AuthFailure { error: String },
    Connected,
    Disconnected,
    Message { message: MessageDto },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{MessageKey, MessageType, JID};

    fn message(from_me: bool, ack: Ack) -> Message {
        let me = JID::user("5511000000000");
        let peer = JID::user("5511999990000");
        Message {
            id: MessageKey {
                from_me,
                remote: peer.clone(),
                id: "3EB0AA".into(),
            },
            from: if from_me { me.clone() } else { peer.clone() },
            to: if from_me { peer } else { me },
            from_me,
            kind: MessageType::Chat,
            body: "oi".into(),
            timestamp: 1_700_000_000,
            ack,
        }
    }

    #[test]
    fn history_message_shape() {
        let value = serde_json::to_value(MessageDto::from_history(&message(true, Ack::Read))).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "true_5511999990000@c.us_3EB0AA",
                "conversationId": "5511999990000@c.us",
                "fromMe": true,
                "contactId": "me",
                "type": "chat",
                "content": "oi",
                "timestamp": "2023-11-14T22:13:20.000Z",
                "status": "read"
            })
        );
    }

    #[test]
    fn ack_below_device_is_sent() {
        let dto = MessageDto::from_history(&message(true, Ack::Server));
        assert_eq!(dto.status, "sent");
        let dto = MessageDto::from_history(&message(false, Ack::Device));
        assert_eq!(dto.status, "read");
        assert_eq!(dto.contact_id.as_deref(), Some("5511999990000@c.us"));
    }

    #[test]
    fn inbound_message_is_received() {
        let dto = MessageDto::inbound(&message(false, Ack::Device));
        assert_eq!(dto.status, "received");
        assert_eq!(dto.contact_id.as_deref(), Some("5511999990000@c.us"));
    }

    #[test]
    fn sent_message_has_no_contact_id() {
        let now = from_unix(1_700_000_000);
        let value = serde_json::to_value(MessageDto::sent(
            &message(true, Ack::Server),
            "5511999990000@c.us".into(),
            now,
        ))
        .unwrap();
        assert!(value.get("contactId").is_none());
        assert_eq!(value["type"], "text");
        assert_eq!(value["fromMe"], true);
    }

    #[test]
    fn contact_shapes() {
        let mut contact = Contact::new(JID::user("5511999990000"));
        contact.push_name = Some("Ana".into());
        let now = from_unix(0);

        let value = serde_json::to_value(ContactDto::from_contact(&contact, now)).unwrap();
        assert_eq!(value["name"], "Ana");
        assert_eq!(value["pushName"], "Ana");
        assert_eq!(value["phone"], "5511999990000");
        assert_eq!(value["status"], "active");
        assert_eq!(value["createdAt"], "1970-01-01T00:00:00.000Z");

        let value = serde_json::to_value(ContactDto::embedded(&contact, now)).unwrap();
        assert!(value.get("pushName").is_none());
    }

    #[test]
    fn frames_are_tagged() {
        assert_eq!(
            serde_json::to_value(Frame::Connected).unwrap(),
            json!({ "type": "connected" })
        );
        assert_eq!(
            serde_json::to_value(Frame::Qr { qr: "data:x".into() }).unwrap(),
            json!({ "type": "qr", "qr": "data:x" })
        );
        assert_eq!(
            serde_json::to_value(Frame::AuthFailure { error: "bad".into() }).unwrap(),
            json!({ "type": "auth_failure", "error": "bad" })
        );
    }
}
