//! Client events re-broadcast to socket connections.

use std::sync::{Arc, Weak};

use log::{info, warn};

use crate::protocol::{render_qr_ascii, render_qr_data_url};
use crate::relay::dto::{Frame, MessageDto};
use crate::relay::state::{ConnectionStatus, RelayState};
use crate::types::{ClientInfo, DisconnectReason, Event, Message, QRCode};

/// Hook the relay onto the client's events.
pub fn register_event_handlers(relay: &Arc<RelayState>) {
    let weak: Weak<RelayState> = Arc::downgrade(relay);
    relay.messenger.add_event_handler(Box::new(move |event| {
        if let Some(relay) = weak.upgrade() {
            dispatch(&relay, event);
        }
    }));
}

fn dispatch(relay: &RelayState, event: Event) {
    match event {
        Event::QRCode(qr) => on_qr(relay, qr),
        Event::Authenticated => on_authenticated(relay),
        Event::AuthFailure(reason) => on_auth_failure(relay, reason),
        Event::Ready(info) => on_ready(relay, info),
        Event::Disconnected(reason) => on_disconnected(relay, reason),
        Event::Message(message) => on_message(relay, message),
    }
}

fn on_qr(relay: &RelayState, qr: QRCode) {
    let data_url = match render_qr_data_url(&qr.code) {
        Ok(url) => url,
        Err(err) => {
            warn!("dropping QR code: {err}");
            return;
        }
    };
    match render_qr_ascii(&qr.code) {
        Ok(ascii) => info!("QR code issued, valid for {}s\n{ascii}", qr.timeout.as_secs()),
        Err(_) => info!("QR code issued, valid for {}s", qr.timeout.as_secs()),
    }

    relay.update_view(|view| {
        view.status = ConnectionStatus::QrRequired;
        view.qr = Some(data_url.clone());
    });
    relay.broadcast(&Frame::Qr { qr: data_url });
}

fn on_authenticated(relay: &RelayState) {
    info!("session authenticated");
    relay.broadcast(&Frame::Authenticated);
}

fn on_auth_failure(relay: &RelayState, reason: String) {
    warn!("authentication failed: {reason}");
    relay.update_view(|view| {
        view.status = ConnectionStatus::Disconnected;
        view.info = None;
    });
    relay.broadcast(&Frame::AuthFailure { error: reason });
}

fn on_ready(relay: &RelayState, info: ClientInfo) {
    info!("WhatsApp connected as {}", info.wid.serialized());
    relay.update_view(|view| {
        view.status = ConnectionStatus::Connected;
        view.qr = None;
        view.info = Some(info);
    });
    relay.broadcast(&Frame::Connected);
}

fn on_disconnected(relay: &RelayState, reason: DisconnectReason) {
    info!("disconnected: {reason}");
    relay.update_view(|view| {
        view.status = ConnectionStatus::Disconnected;
        view.qr = None;
        view.info = None;
    });
    relay.broadcast(&Frame::Disconnected);
}

fn on_message(relay: &RelayState, message: Message) {
    relay.broadcast(&Frame::Message {
        message: MessageDto::inbound(&message),
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::client::Messenger;
    use crate::config::RelayConfig;
    use crate::protocol::SessionClient;
    use crate::store::MemoryStore;
    use crate::types::JID;

    fn relay() -> Arc<RelayState> {
        let client = SessionClient::new(RelayConfig::default(), Arc::new(MemoryStore::new()));
        let relay = RelayState::new(Arc::new(client), RelayConfig::default());
        register_event_handlers(&relay);
        relay
    }

    fn info() -> ClientInfo {
        ClientInfo {
            wid: JID::user("5511000000000"),
            pushname: "Me".into(),
            platform: "android".into(),
        }
    }

    fn next_frame(rx: &mut tokio::sync::broadcast::Receiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn qr_sets_status_and_broadcasts_data_url() {
        let relay = relay();
        let mut rx = relay.subscribe();

        dispatch(
            &relay,
            Event::QRCode(QRCode {
                code: "2@ref,a,b,c".into(),
                timeout: Duration::from_secs(60),
            }),
        );

        let view = relay.view();
        assert_eq!(view.status, ConnectionStatus::QrRequired);
        let qr = view.qr.unwrap();
        assert!(qr.starts_with("data:image/svg+xml;base64,"));

        let frame = next_frame(&mut rx);
        assert_eq!(frame["type"], "qr");
        assert_eq!(frame["qr"], qr.as_str());
    }

    #[test]
    fn ready_clears_qr_and_keeps_info() {
        let relay = relay();
        relay.update_view(|view| view.qr = Some("data:old".into()));
        let mut rx = relay.subscribe();

        dispatch(&relay, Event::Ready(info()));

        let view = relay.view();
        assert_eq!(view.status, ConnectionStatus::Connected);
        assert!(view.qr.is_none());
        assert_eq!(view.info.unwrap().pushname, "Me");
        assert_eq!(next_frame(&mut rx)["type"], "connected");
    }

    #[test]
    fn disconnect_resets_view() {
        let relay = relay();
        dispatch(&relay, Event::Ready(info()));
        let mut rx = relay.subscribe();

        dispatch(&relay, Event::Disconnected(DisconnectReason::Logout));

        let view = relay.view();
        assert_eq!(view.status, ConnectionStatus::Disconnected);
        assert!(view.info.is_none());
        assert_eq!(next_frame(&mut rx)["type"], "disconnected");
    }

    #[test]
    fn auth_events_are_forwarded() {
        let relay = relay();
        let mut rx = relay.subscribe();

        dispatch(&relay, Event::Authenticated);
        dispatch(&relay, Event::AuthFailure("session corrupt".into()));

        assert_eq!(next_frame(&mut rx)["type"], "authenticated");
        let failure = next_frame(&mut rx);
        assert_eq!(failure["type"], "auth_failure");
        assert_eq!(failure["error"], "session corrupt");
    }

    #[tokio::test]
    async fn inbound_messages_reach_sockets() {
        let mut state = crate::state::SessionState::default();
        state.register(JID::user("5511000000000"), None);
        let client = Arc::new(SessionClient::new(
            RelayConfig::default(),
            Arc::new(MemoryStore::with_state(state)),
        ));
        let relay = RelayState::new(client.clone(), RelayConfig::default());
        register_event_handlers(&relay);
        client.initialize().await.unwrap();
        let mut rx = relay.subscribe();

        client
            .receive_message(JID::user("5511999990000"), "oi", None)
            .await
            .unwrap();

        let frame = next_frame(&mut rx);
        assert_eq!(frame["type"], "message");
        assert_eq!(frame["message"]["content"], "oi");
        assert_eq!(frame["message"]["status"], "received");
        assert_eq!(frame["message"]["contactId"], "5511999990000@c.us");
    }
}
