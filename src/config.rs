use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base configuration used by the relay and its session client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the HTTP server binds to.
    pub bind_host: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Directory the local auth strategy keeps sessions in.
    pub session_dir: PathBuf,
    /// Separates sessions when several relays share a session directory.
    pub client_id: Option<String>,
    /// Human-readable device name shown on the linked phone.
    pub device_name: String,
    /// Expired QR codes tolerated before giving up; 0 never gives up.
    pub qr_max_retries: u32,
    /// How often the session store is re-read for changes made elsewhere.
    pub link_poll_interval_ms: u64,
    /// Maximum conversations returned by the conversations endpoint.
    pub conversation_limit: usize,
    /// Maximum messages returned per conversation.
    pub message_limit: usize,
    /// Messages kept per chat in the stored session; 0 keeps everything.
    pub message_retention: usize,
    /// Keep the session on disk; when false it only lives in memory.
    pub persist_session: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            port: 3001,
            session_dir: PathBuf::from("./session"),
            client_id: None,
            device_name: "whatsmeow-relay".into(),
            qr_max_retries: 0,
            link_poll_interval_ms: 1_000,
            conversation_limit: 50,
            message_limit: 50,
            message_retention: 500,
            persist_session: true,
        }
    }
}

impl RelayConfig {
    /// Override the bind address.
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    /// Override the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the session directory.
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = dir.into();
        self
    }

    /// Set the client id used to name the session directory.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Override how many expired QR codes are tolerated.
    pub fn with_qr_max_retries(mut self, retries: u32) -> Self {
        self.qr_max_retries = retries;
        self
    }

    /// Override how many messages per chat the session keeps.
    pub fn with_message_retention(mut self, keep: usize) -> Self {
        self.message_retention = keep;
        self
    }

    /// Override the link polling interval.
    pub fn with_link_poll_interval(mut self, interval: Duration) -> Self {
        self.link_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Keep the session in memory only.
    pub fn without_persistence(mut self) -> Self {
        self.persist_session = false;
        self
    }

    /// How often the session store is re-read, while pairing and once ready.
    pub fn link_poll_interval(&self) -> Duration {
        Duration::from_millis(self.link_poll_interval_ms.max(1))
    }

    /// `host:port` the server listens on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_web_front_end() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.session_dir, PathBuf::from("./session"));
        assert_eq!(config.conversation_limit, 50);
        assert_eq!(config.message_limit, 50);
        assert_eq!(config.listen_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn builders_override_fields() {
        let config = RelayConfig::default()
            .with_port(8080)
            .with_bind_host("127.0.0.1")
            .with_client_id("sales")
            .with_qr_max_retries(3)
            .with_link_poll_interval(Duration::from_millis(250))
            .with_message_retention(100)
            .without_persistence();

        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.client_id.as_deref(), Some("sales"));
        assert_eq!(config.qr_max_retries, 3);
        assert_eq!(config.message_retention, 100);
        assert_eq!(config.link_poll_interval(), Duration::from_millis(250));
        assert!(!config.persist_session);
    }
}
