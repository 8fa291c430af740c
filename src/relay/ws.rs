//! Socket channel: every connection receives every broadcast frame.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;

use crate::relay::state::RelayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let conn_id = uuid::Uuid::new_v4();
    let mut frames = state.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!("socket {conn_id} connected ({} open)", state.socket_count());

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(text) => {
                    if sender.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("socket {conn_id} lagging; skipped {skipped} frame(s)");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                // Front-ends only listen.
                Some(Ok(_)) => debug!("socket {conn_id} sent an ignored frame"),
            },
        }
    }

    info!("socket {conn_id} closed");
}
