// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation service: sending messages and reading threads.

use crate::conversation::ConversationId;
use crate::db::{new_document_id, FirestoreDb};
use crate::error::AppError;
use crate::feed::{ConversationView, MessageFeed};
use crate::models::Message;
use dashmap::DashMap;
use std::sync::Arc;

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Warning shown when the input box is empty.
pub const EMPTY_MESSAGE_WARNING: &str = "Message cannot be empty!";

/// Clock entries kept before idle ones are pruned.
const CLOCK_PRUNE_THRESHOLD: usize = 1024;

/// A clock idle for longer than this is dropped on pruning. Writers whose
/// wall clock lags by less than this still get increasing timestamps.
const CLOCK_IDLE_MS: i64 = 60_000;

/// Sends and reads one-to-one messages.
#[derive(Clone)]
pub struct ChatService {
    db: FirestoreDb,
    /// Last timestamp handed out per conversation, pruned once it grows
    /// past `CLOCK_PRUNE_THRESHOLD`.
    clocks: Arc<DashMap<ConversationId, i64>>,
}

impl ChatService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            clocks: Arc::new(DashMap::new()),
        }
    }

    /// Append a message from `sender_id` to `receiver_id`.
    ///
    /// Empty or whitespace-only text, or an unresolved sender/receiver, is
    /// rejected before anything is written.
    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<Message, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(EMPTY_MESSAGE_WARNING.to_string()));
        }
        if sender_id.trim().is_empty() || receiver_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Conversation is not ready yet.".to_string(),
            ));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message is too long (max {} characters).",
                MAX_MESSAGE_CHARS
            )));
        }

        let conversation_id = ConversationId::derive(sender_id, receiver_id)?;
        let now = chrono::Utc::now().timestamp_millis();

        let message = Message {
            id: new_document_id()?,
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            text: text.to_string(),
            created_at: self.next_timestamp(&conversation_id, now),
        };

        self.db.add_message(&conversation_id, &message).await?;

        if let Err(e) = self.db.touch_user(sender_id, message.created_at).await {
            tracing::warn!(error = %e, user_id = sender_id, "Failed to record sender activity");
        }

        tracing::info!(
            conversation = %conversation_id,
            message_id = %message.id,
            "Message sent"
        );
        Ok(message)
    }

    /// One-shot read of the conversation between `viewer_id` and `peer_id`.
    pub async fn history(&self, viewer_id: &str, peer_id: &str) -> Result<Vec<Message>, AppError> {
        let conversation_id = ConversationId::derive(viewer_id, peer_id)?;
        let snapshot = self.db.list_messages(&conversation_id).await?;
        Ok(MessageFeed::from_snapshot(snapshot).into_messages())
    }

    /// A conversation pane for `viewer_id`, with no conversation open yet.
    pub fn view(&self, viewer_id: &str) -> ConversationView {
        ConversationView::new(self.db.clone(), viewer_id)
    }

    /// Strictly increasing timestamp within a conversation.
    fn next_timestamp(&self, conversation_id: &ConversationId, now: i64) -> i64 {
        if self.clocks.len() > CLOCK_PRUNE_THRESHOLD {
            self.prune_idle_clocks(now);
        }

        let mut last = self.clocks.entry(conversation_id.clone()).or_insert(0);
        let ts = now.max(*last + 1);
        *last = ts;
        ts
    }

    /// Forget clocks whose last timestamp is well behind `now`. A dropped
    /// entry restarts at `now`, which is already past its old value.
    fn prune_idle_clocks(&self, now: i64) {
        let before = self.clocks.len();
        self.clocks.retain(|_, last| *last >= now - CLOCK_IDLE_MS);
        tracing::debug!(
            pruned = before.saturating_sub(self.clocks.len()),
            "Pruned idle conversation clocks"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_strictly_increase_per_conversation() {
        let service = ChatService::new(FirestoreDb::new_in_memory());
        let ab = ConversationId::derive("a", "b").unwrap();
        let ac = ConversationId::derive("a", "c").unwrap();

        assert_eq!(service.next_timestamp(&ab, 100), 100);
        assert_eq!(service.next_timestamp(&ab, 100), 101);
        // Clock went backwards
        assert_eq!(service.next_timestamp(&ab, 50), 102);
        assert_eq!(service.next_timestamp(&ab, 500), 500);

        // Other conversations have their own clock
        assert_eq!(service.next_timestamp(&ac, 100), 100);
    }

    #[test]
    fn test_idle_clocks_are_pruned() {
        let service = ChatService::new(FirestoreDb::new_in_memory());
        let ab = ConversationId::derive("a", "b").unwrap();
        let ac = ConversationId::derive("a", "c").unwrap();
        let now = 1_000_000;

        service.next_timestamp(&ab, 100);
        assert_eq!(service.next_timestamp(&ac, now), now);
        assert_eq!(service.next_timestamp(&ac, now), now + 1);

        service.prune_idle_clocks(now);
        assert_eq!(service.clocks.len(), 1);
        assert!(!service.clocks.contains_key(&ab));

        // Recent clocks keep counting; pruned ones restart at the wall clock
        assert_eq!(service.next_timestamp(&ac, now), now + 2);
        assert_eq!(service.next_timestamp(&ab, now), now);
    }

    #[test]
    fn test_clock_map_is_bounded() {
        let service = ChatService::new(FirestoreDb::new_in_memory());
        for i in 0..=CLOCK_PRUNE_THRESHOLD {
            let id = ConversationId::derive(&format!("u{i}"), "z").unwrap();
            service.next_timestamp(&id, i as i64);
        }
        assert_eq!(service.clocks.len(), CLOCK_PRUNE_THRESHOLD + 1);

        let later = ConversationId::derive("a", "b").unwrap();
        assert_eq!(service.next_timestamp(&later, 10_000_000), 10_000_000);
        assert_eq!(service.clocks.len(), 1);
    }

    async fn assert_rejected(service: &ChatService, sender: &str, receiver: &str, text: &str) {
        let result = service.send_message(sender, receiver, text).await;
        assert!(
            matches!(result, Err(AppError::Validation(_))),
            "{sender:?} -> {receiver:?}: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_rejected_sends_write_nothing() {
        let db = FirestoreDb::new_in_memory();
        let service = ChatService::new(db.clone());

        assert_rejected(&service, "", "bob", "hi").await;
        assert_rejected(&service, "alice", "", "hi").await;
        assert_rejected(&service, "alice", " ", "hi").await;
        assert_rejected(&service, "\t", "bob", "hi").await;
        assert_rejected(&service, "alice", "bob", "").await;
        assert_rejected(&service, "alice", "bob", "  ").await;
        assert_rejected(&service, "alice", "bob", &"x".repeat(MAX_MESSAGE_CHARS + 1)).await;

        let conv = ConversationId::derive("alice", "bob").unwrap();
        assert!(db.list_messages(&conv).await.unwrap().is_empty());
        assert!(db.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_warning_wins() {
        let service = ChatService::new(FirestoreDb::new_in_memory());

        match service.send_message("", "bob", " ").await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, EMPTY_MESSAGE_WARNING),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_message_at_length_limit_is_accepted() {
        let db = FirestoreDb::new_in_memory();
        let service = ChatService::new(db.clone());

        // Limit counts characters, not bytes
        let text = "é".repeat(MAX_MESSAGE_CHARS);
        let sent = service.send_message("alice", "bob", &text).await.unwrap();
        assert_eq!(sent.text.chars().count(), MAX_MESSAGE_CHARS);

        let conv = ConversationId::derive("alice", "bob").unwrap();
        assert_eq!(db.list_messages(&conv).await.unwrap(), vec![sent]);
    }
}
