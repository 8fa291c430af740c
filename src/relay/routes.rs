//! HTTP endpoints.
//!
//! - GET  /health                          connection status, QR, account name
//! - GET  /qr                              current pairing QR
//! - GET  /api/contacts                    saved contacts
//! - GET  /api/conversations               most recent chats
//! - GET  /api/messages/:conversationId    latest messages of a chat
//! - POST /api/messages/send               send a text message
//! - GET  /ws                              live event socket

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::relay::dto::{ContactDto, ConversationDto, MessageDto};
use crate::relay::error::ApiError;
use crate::relay::state::RelayState;
use crate::relay::ws::ws_handler;
use crate::types::normalize_chat_id;

/// Create the relay router.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/qr", get(current_qr))
        .route("/api/contacts", get(list_contacts))
        .route("/api/conversations", get(list_conversations))
        .route("/api/messages/send", post(send_message))
        .route("/api/messages/:conversation_id", get(list_messages))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    to: String,
    content: String,
}

async fn health(State(state): State<Arc<RelayState>>) -> Json<Value> {
    let view = state.view();
    Json(json!({
        "status": view.status,
        "qr": view.qr,
        "info": view.info.map(|info| json!({ "pushname": info.pushname })),
    }))
}

async fn current_qr(State(state): State<Arc<RelayState>>) -> Result<Json<Value>, ApiError> {
    match state.view().qr {
        Some(qr) => Ok(Json(json!({ "qr": qr }))),
        None => Err(ApiError::NotFound("QR not available".into())),
    }
}

async fn list_contacts(
    State(state): State<Arc<RelayState>>,
) -> Result<Json<Vec<ContactDto>>, ApiError> {
    let contacts = state.messenger.get_contacts().await?;
    let now = Utc::now();
    Ok(Json(
        contacts
            .iter()
            .filter(|contact| contact.is_my_contact && !contact.id.user.is_empty())
            .map(|contact| ContactDto::from_contact(contact, now))
            .collect(),
    ))
}

async fn list_conversations(
    State(state): State<Arc<RelayState>>,
) -> Result<Json<Vec<ConversationDto>>, ApiError> {
    let chats = state.messenger.get_chats().await?;
    let now = Utc::now();

    let conversations = try_join_all(
        chats
            .iter()
            .take(state.config.conversation_limit)
            .map(|chat| {
                let messenger = state.messenger.clone();
                async move {
                    let contact = messenger.get_contact_by_id(&chat.id.serialized()).await?;
                    Ok::<_, ApiError>(ConversationDto::new(chat, &contact, now))
                }
            }),
    )
    .await?;

    Ok(Json(conversations))
}

async fn list_messages(
    State(state): State<Arc<RelayState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let chat = state.messenger.get_chat_by_id(&conversation_id).await?;
    let messages = state
        .messenger
        .fetch_messages(&chat.id.serialized(), state.config.message_limit)
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from_history).collect()))
}

async fn send_message(
    State(state): State<Arc<RelayState>>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<MessageDto>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if request.to.trim().is_empty() {
        return Err(ApiError::BadRequest("missing recipient".into()));
    }

    let chat_id = normalize_chat_id(&request.to);
    let message = state.messenger.send_message(&chat_id, &request.content).await?;
    Ok(Json(MessageDto::sent(&message, chat_id, Utc::now())))
}
