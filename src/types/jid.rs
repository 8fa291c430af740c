//! WhatsApp JID (Jabber ID) types.
//!
//! JIDs are used to identify users, groups, and other entities in WhatsApp.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Known JID servers on WhatsApp
pub mod servers {
    pub const DEFAULT_USER: &str = "s.whatsapp.net";
    pub const GROUP: &str = "g.us";
    pub const LEGACY_USER: &str = "c.us";
    pub const BROADCAST: &str = "broadcast";
    pub const HIDDEN_USER: &str = "lid";
    pub const NEWSLETTER: &str = "newsletter";
}

/// JID represents a WhatsApp user, group or broadcast address.
///
/// There are two types of JIDs:
/// - Regular JID pairs (user and server)
/// - AD-JIDs (user, agent and device) for specific devices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JID {
    pub user: String,
    pub raw_agent: u8,
    pub device: u16,
    pub server: String,
}

impl JID {
    /// Creates a new regular JID.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
            ..Default::default()
        }
    }

    /// Creates a user JID on the legacy `c.us` server used by web sessions.
    pub fn user(user: impl Into<String>) -> Self {
        Self::new(user, servers::LEGACY_USER)
    }

    /// Returns a version of the JID without agent and device.
    pub fn to_non_ad(&self) -> Self {
        Self::new(self.user.clone(), self.server.clone())
    }

    /// The `user@server` form web clients use as a stable identifier.
    pub fn serialized(&self) -> String {
        self.to_non_ad().to_string()
    }

    pub fn is_group(&self) -> bool {
        self.server == servers::GROUP
    }

    /// Returns true for `status@broadcast` and broadcast lists.
    pub fn is_broadcast(&self) -> bool {
        self.server == servers::BROADCAST
    }

    /// Returns true if the JID is empty (no server).
    pub fn is_empty(&self) -> bool {
        self.server.is_empty()
    }
}

/// Turn a recipient given by a front-end into a chat id.
///
/// Bare phone numbers are addressed on `c.us`; anything containing `@` is
/// taken as a full chat id.
pub fn normalize_chat_id(to: &str) -> String {
    let to = to.trim();
    if to.contains('@') {
        to.to_string()
    } else {
        format!("{}@{}", to, servers::LEGACY_USER)
    }
}

impl fmt::Display for JID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw_agent > 0 {
            write!(f, "{}.{}:{}@{}", self.user, self.raw_agent, self.device, self.server)
        } else if self.device > 0 {
            write!(f, "{}:{}@{}", self.user, self.device, self.server)
        } else if !self.user.is_empty() {
            write!(f, "{}@{}", self.user, self.server)
        } else {
            write!(f, "{}", self.server)
        }
    }
}

/// Error type for JID parsing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to parse JID: {0}")]
pub struct ParseJIDError(pub String);

impl FromStr for JID {
    type Err = ParseJIDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('@').collect();

        if parts.len() == 1 {
            return Ok(JID::new("", parts[0]));
        }
        if parts.len() > 2 {
            return Err(ParseJIDError("unexpected number of @ in JID".to_string()));
        }

        let user_str = parts[0].to_string();
        let server = parts[1].to_string();

        let mut jid = JID {
            user: user_str.clone(),
            server,
            ..Default::default()
        };

        // Check for AD JID format (user.agent:device@server)
        if user_str.contains('.') {
            let user_parts: Vec<&str> = user_str.split('.').collect();
            if user_parts.len() != 2 {
                return Err(ParseJIDError("unexpected number of dots in JID".to_string()));
            }
            jid.user = user_parts[0].to_string();

            let ad_parts: Vec<&str> = user_parts[1].split(':').collect();
            if ad_parts.len() > 2 {
                return Err(ParseJIDError("unexpected number of colons in JID".to_string()));
            }

            jid.raw_agent = ad_parts[0]
                .parse()
                .map_err(|_| ParseJIDError("failed to parse agent from JID".to_string()))?;

            if ad_parts.len() == 2 {
                jid.device = ad_parts[1]
                    .parse()
                    .map_err(|_| ParseJIDError("failed to parse device from JID".to_string()))?;
            }
        } else if user_str.contains(':') {
            let user_parts: Vec<&str> = user_str.split(':').collect();
            if user_parts.len() != 2 {
                return Err(ParseJIDError("unexpected number of colons in JID".to_string()));
            }
            jid.user = user_parts[0].to_string();
            jid.device = user_parts[1]
                .parse()
                .map_err(|_| ParseJIDError("failed to parse device from JID".to_string()))?;
        }

        Ok(jid)
    }
}

impl Serialize for JID {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JID {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// Common JIDs
lazy_static::lazy_static! {
    pub static ref STATUS_BROADCAST_JID: JID = JID::new("status", servers::BROADCAST);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_jid() {
        let jid: JID = "5511999990000@c.us".parse().unwrap();
        assert_eq!(jid.user, "5511999990000");
        assert_eq!(jid.server, servers::LEGACY_USER);
        assert_eq!(jid.device, 0);
        assert_eq!(jid.raw_agent, 0);
    }

    #[test]
    fn test_parse_device_jid() {
        let jid: JID = "1234567890:2@s.whatsapp.net".parse().unwrap();
        assert_eq!(jid.user, "1234567890");
        assert_eq!(jid.device, 2);
        assert_eq!(jid.serialized(), "1234567890@s.whatsapp.net");
    }

    #[test]
    fn test_parse_ad_jid() {
        let jid: JID = "1234567890.0:1@s.whatsapp.net".parse().unwrap();
        assert_eq!(jid.user, "1234567890");
        assert_eq!(jid.raw_agent, 0);
        assert_eq!(jid.device, 1);
    }

    #[test]
    fn test_rejects_double_at() {
        assert!("a@b@c.us".parse::<JID>().is_err());
    }

    #[test]
    fn test_group_jid() {
        let jid: JID = "123456789-1234567890@g.us".parse().unwrap();
        assert!(jid.is_group());
        assert!(!STATUS_BROADCAST_JID.is_group());
        assert!(STATUS_BROADCAST_JID.is_broadcast());
    }

    #[test]
    fn test_normalize_chat_id() {
        assert_eq!(normalize_chat_id("5511999990000"), "5511999990000@c.us");
        assert_eq!(normalize_chat_id("123-456@g.us"), "123-456@g.us");
        assert_eq!(normalize_chat_id(" 5511 "), "5511@c.us");
    }

    #[test]
    fn test_serde_as_string() {
        let jid = JID::user("5511999990000");
        let json = serde_json::to_string(&jid).unwrap();
        assert_eq!(json, "\"5511999990000@c.us\"");
        let back: JID = serde_json::from_str(&json).unwrap();
        assert_eq!(back, jid);
    }
}
