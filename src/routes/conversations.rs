// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation routes: history, sending and the live message stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::conversation::ConversationId;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Message;
use crate::time_utils::format_millis_rfc3339;
use crate::AppState;

/// SSE event name carrying the full ordered message list.
pub const MESSAGES_EVENT: &str = "messages";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/conversations/{peer_id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/api/conversations/{peer_id}/stream", get(stream_messages))
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub created_at: i64,
    pub sent_at: Option<String>,
    /// Sent by the viewer (drives left/right placement)
    pub mine: bool,
}

impl MessageResponse {
    fn new(message: Message, viewer_id: &str) -> Self {
        Self {
            sent_at: format_millis_rfc3339(message.created_at),
            mine: message.sender_id == viewer_id,
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessagesResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageResponse>,
}

impl MessagesResponse {
    fn new(conversation_id: &ConversationId, viewer_id: &str, messages: Vec<Message>) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            messages: messages
                .into_iter()
                .map(|m| MessageResponse::new(m, viewer_id))
                .collect(),
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// One-shot read of the conversation, oldest first.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(peer_id): Path<String>,
) -> Result<Json<MessagesResponse>> {
    let conversation_id = ConversationId::derive(&auth.user_id, &peer_id)?;
    let messages = state.chat_service.history(&auth.user_id, &peer_id).await?;
    Ok(Json(MessagesResponse::new(
        &conversation_id,
        &auth.user_id,
        messages,
    )))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(peer_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    // Input checks before any database read.
    if req.text.trim().is_empty() {
        return Err(AppError::Validation(
            crate::services::chat::EMPTY_MESSAGE_WARNING.to_string(),
        ));
    }
    ConversationId::derive(&auth.user_id, &peer_id)?;

    if state.db.get_user(&peer_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {}", peer_id)));
    }

    let message = state
        .chat_service
        .send_message(&auth.user_id, &peer_id, &req.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(message, &auth.user_id)),
    ))
}

/// Live feed as Server-Sent Events.
///
/// Each `messages` event carries the full ordered list. Only the latest
/// list is kept for a slow client. Closing the connection drops the view
/// and with it the subscription.
async fn stream_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(peer_id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let (tx, rx) = watch::channel(Vec::<Message>::new());

    let mut view = state.chat_service.view(&auth.user_id);
    let conversation_id = view
        .open(&peer_id, move |messages| {
            tx.send_replace(messages.to_vec());
        })
        .await?
        .clone();

    tracing::debug!(conversation = %conversation_id, user_id = %auth.user_id, "Stream opened");

    let viewer_id = auth.user_id;
    let events = stream::unfold((rx, view), move |(mut rx, view)| {
        let conversation_id = conversation_id.clone();
        let viewer_id = viewer_id.clone();
        async move {
            rx.changed().await.ok()?;
            let messages = rx.borrow_and_update().clone();
            let payload = MessagesResponse::new(&conversation_id, &viewer_id, messages);
            let event = Event::default().event(MESSAGES_EVENT).json_data(payload);
            Some((event, (rx, view)))
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
