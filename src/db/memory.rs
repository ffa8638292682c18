// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store used offline and in tests.
//!
//! Mirrors the subset of Firestore behavior the app relies on: keyed
//! documents, ordered message queries and insertion notifications.

use crate::conversation::ConversationId;
use crate::models::{Message, Preferences, User};
use dashmap::DashMap;
use tokio::sync::mpsc;

/// In-memory collections keyed like their Firestore counterparts.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    preferences: DashMap<String, Preferences>,
    /// conversation id -> messages in insertion order
    messages: DashMap<String, Vec<Message>>,
    /// conversation id -> live watchers
    watchers: DashMap<String, Vec<mpsc::UnboundedSender<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.clone())
    }

    pub fn upsert_user(&self, user: &User) {
        self.users.insert(user.id.clone(), user.clone());
    }

    /// All users ordered by document ID, like an unordered Firestore scan.
    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub fn get_preferences(&self, user_id: &str) -> Option<Preferences> {
        self.preferences.get(user_id).map(|p| *p)
    }

    pub fn set_preferences(&self, user_id: &str, prefs: Preferences) {
        self.preferences.insert(user_id.to_string(), prefs);
    }

    /// Messages of a conversation ordered by ascending `created_at`.
    pub fn list_messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        let mut messages = self
            .messages
            .get(conversation_id.as_str())
            .map(|m| m.clone())
            .unwrap_or_default();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    /// Store a message and notify the conversation's live watchers.
    pub fn add_message(&self, conversation_id: &ConversationId, message: &Message) {
        self.messages
            .entry(conversation_id.as_str().to_string())
            .or_default()
            .push(message.clone());

        if let Some(mut watchers) = self.watchers.get_mut(conversation_id.as_str()) {
            // Drop watchers whose receiving side is gone
            watchers.retain(|tx| tx.send(message.clone()).is_ok());
        }
        self.watchers
            .remove_if(conversation_id.as_str(), |_, watchers| watchers.is_empty());
    }

    /// Register a watcher that receives every message added afterwards.
    pub fn watch_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers
            .entry(conversation_id.as_str().to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Number of watchers still listening on a conversation.
    pub fn live_watchers(&self, conversation_id: &ConversationId) -> usize {
        self.watchers
            .get(conversation_id.as_str())
            .map(|watchers| watchers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}
