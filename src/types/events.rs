//! Event types emitted by the session client.
//!
//! These events are emitted when various things happen on the WhatsApp session.

use std::fmt;
use std::time::Duration;

use crate::types::{ClientInfo, Message};

/// QR code event for pairing
#[derive(Debug, Clone, PartialEq)]
pub struct QRCode {
    /// The QR code data to display
    pub code: String,
    /// How long the code is valid
    pub timeout: Duration,
}

/// Reason for disconnection
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    /// Session was logged out, locally or from the phone
    Logout,
    /// Session was opened somewhere else
    Conflict,
    /// Every QR code expired without the device being linked
    MaxQrRetries,
    /// The session was reset by the upstream client
    Navigation,
    /// Anything else
    Other(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Logout => f.write_str("LOGOUT"),
            DisconnectReason::Conflict => f.write_str("CONFLICT"),
            DisconnectReason::MaxQrRetries => f.write_str("Max qrcode retries reached"),
            DisconnectReason::Navigation => f.write_str("NAVIGATION"),
            DisconnectReason::Other(reason) => f.write_str(reason),
        }
    }
}

/// All possible events that can be received
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new pairing QR code is available.
    QRCode(QRCode),
    /// The stored or freshly paired credentials were accepted.
    Authenticated,
    /// The stored credentials were rejected.
    AuthFailure(String),
    /// The session is usable.
    Ready(ClientInfo),
    Disconnected(DisconnectReason),
    /// A message was received from someone else.
    Message(Message),
}

impl Event {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::QRCode(_) => "qr",
            Event::Authenticated => "authenticated",
            Event::AuthFailure(_) => "auth_failure",
            Event::Ready(_) => "ready",
            Event::Disconnected(_) => "disconnected",
            Event::Message(_) => "message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_reasons_use_web_client_names() {
        assert_eq!(DisconnectReason::Logout.to_string(), "LOGOUT");
        assert_eq!(DisconnectReason::Conflict.to_string(), "CONFLICT");
        assert_eq!(DisconnectReason::Navigation.to_string(), "NAVIGATION");
        assert_eq!(
            DisconnectReason::MaxQrRetries.to_string(),
            "Max qrcode retries reached"
        );
        assert_eq!(
            DisconnectReason::Other("stream errored".into()).to_string(),
            "stream errored"
        );
    }
}
