use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::types::{Ack, Chat, Contact, Message, MessageKey, MessageType, JID, STATUS_BROADCAST_JID};

/// Public key material advertised in pairing QR codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceKeys {
    pub noise_public: String,
    pub identity_public: String,
    pub adv_secret: String,
}

impl DeviceKeys {
    /// Generate fresh random key material.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut random_b64 = || {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            STANDARD.encode(bytes)
        };
        Self {
            noise_public: random_b64(),
            identity_public: random_b64(),
            adv_secret: random_b64(),
        }
    }
}

/// Everything the local auth strategy persists about a session.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionState {
    /// JID associated with the linked account, if any.
    pub registered_jid: Option<JID>,
    /// Display name of the linked account.
    #[serde(default)]
    pub push_name: Option<String>,
    /// Platform of the phone that linked the session.
    #[serde(default)]
    pub platform: Option<String>,
    /// Human-readable device name.
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub keys: Option<DeviceKeys>,
    /// Contacts keyed by serialized JID.
    #[serde(default)]
    pub contacts: BTreeMap<String, Contact>,
    /// Chats keyed by serialized JID.
    #[serde(default)]
    pub chats: BTreeMap<String, Chat>,
    /// Message log, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl SessionState {
    /// Create a new session with a user-specified device name.
    pub fn with_device_name(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            ..Default::default()
        }
    }

    /// Whether a device has been linked.
    pub fn is_registered(&self) -> bool {
        self.registered_jid.is_some()
    }

    /// Record a link and make sure key material exists.
    pub fn register(&mut self, jid: JID, push_name: Option<String>) {
        self.registered_jid = Some(jid.to_non_ad());
        if push_name.is_some() {
            self.push_name = push_name;
        }
        self.ensure_keys();
    }

    /// Key material for QR codes, generated on first use.
    pub fn ensure_keys(&mut self) -> &DeviceKeys {
        self.keys.get_or_insert_with(DeviceKeys::generate)
    }

    /// Insert a contact, or refresh the push name of a known one.
    pub fn upsert_contact(&mut self, jid: &JID, push_name: Option<&str>) -> &Contact {
        let entry = self
            .contacts
            .entry(jid.serialized())
            .or_insert_with(|| Contact::new(jid.to_non_ad()));
        if let Some(push_name) = push_name {
            entry.push_name = Some(push_name.to_string());
        }
        entry
    }

    /// Save a contact to the address book under the given name.
    pub fn save_contact(&mut self, jid: &JID, name: impl Into<String>) {
        let entry = self
            .contacts
            .entry(jid.serialized())
            .or_insert_with(|| Contact::new(jid.to_non_ad()));
        entry.name = Some(name.into());
        entry.is_my_contact = true;
    }

    fn touch_chat(&mut self, jid: &JID, timestamp: i64) -> &mut Chat {
        let chat = self
            .chats
            .entry(jid.serialized())
            .or_insert_with(|| Chat::new(jid.to_non_ad(), timestamp));
        chat.timestamp = chat.timestamp.max(timestamp);
        chat
    }

    /// Record a message we sent.
    pub fn record_message(&mut self, to: JID, body: impl Into<String>, timestamp: i64) -> Message {
        let own = self.registered_jid.clone().unwrap_or_default();
        let to = to.to_non_ad();
        self.touch_chat(&to, timestamp);

        let message = Message {
            id: MessageKey {
                from_me: true,
                remote: to.clone(),
                id: generate_message_id(),
            },
            from: own,
            to,
            from_me: true,
            kind: MessageType::Chat,
            body: body.into(),
            timestamp,
            ack: Ack::Server,
        };
        self.messages.push(message.clone());
        message
    }

    /// Record a message someone sent us and bump the chat's unread count.
    pub fn record_incoming_message(
        &mut self,
        from: JID,
        body: impl Into<String>,
        timestamp: i64,
    ) -> Message {
        let own = self.registered_jid.clone().unwrap_or_default();
        let from = from.to_non_ad();
        self.touch_chat(&from, timestamp).unread_count += 1;

        let message = Message {
            id: MessageKey {
                from_me: false,
                remote: from.clone(),
                id: generate_message_id(),
            },
            from,
            to: own,
            from_me: false,
            kind: MessageType::Chat,
            body: body.into(),
            timestamp,
            ack: Ack::Device,
        };
        self.messages.push(message.clone());
        message
    }

    /// Drop the oldest messages of a chat beyond `keep`; 0 keeps everything.
    pub fn retain_latest(&mut self, chat: &JID, keep: usize) {
        if keep == 0 {
            return;
        }
        let chat = chat.to_non_ad();
        let total = self.messages.iter().filter(|m| m.id.remote == chat).count();
        let mut excess = total.saturating_sub(keep);
        self.messages.retain(|m| {
            if excess > 0 && m.id.remote == chat {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    /// Chats ordered by latest activity, newest first. Status updates are not a chat.
    pub fn chats_by_recent(&self) -> Vec<Chat> {
        let mut chats: Vec<Chat> = self
            .chats
            .values()
            .filter(|chat| chat.id != *STATUS_BROADCAST_JID)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        chats
    }

    /// The last `limit` messages of a chat, oldest first.
    pub fn messages_in(&self, chat: &JID, limit: usize) -> Vec<Message> {
        let chat = chat.to_non_ad();
        let matching: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.id.remote == chat)
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }
}

/// Web-style message id: `3EB0` followed by random hex.
pub fn generate_message_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("3EB0{}", hex::encode_upper(bytes))
}
