// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live, ordered message feeds.
//!
//! A [`FeedSubscription`] couples a backend change stream with a
//! [`MessageFeed`] and pushes the full ordered message list to a callback
//! after every insertion. A [`ConversationView`] owns at most one
//! subscription at a time.

use crate::conversation::ConversationId;
use crate::db::{FirestoreDb, ListenerHandle};
use crate::error::AppError;
use crate::models::Message;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Receives the ordered message list after each change.
pub type FeedCallback = Box<dyn FnMut(&[Message]) + Send + 'static>;

type Sink = Arc<Mutex<Option<FeedCallback>>>;

/// Messages of one conversation ordered by ascending `created_at`.
///
/// Messages with equal timestamps keep the order in which they arrived.
/// Re-delivered messages (same ID) are ignored.
#[derive(Debug, Clone, Default)]
pub struct MessageFeed {
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a feed from a query result, which may be unordered.
    pub fn from_snapshot(snapshot: Vec<Message>) -> Self {
        let mut feed = Self::new();
        for message in snapshot {
            feed.insert(message);
        }
        feed
    }

    /// Insert a message at its ordered position.
    ///
    /// Returns `false` if a message with the same ID is already present.
    pub fn insert(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(at, message);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Invoke the callback unless the subscription was torn down.
fn deliver(sink: &Sink, messages: &[Message]) -> bool {
    let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_mut() {
        Some(callback) => {
            callback(messages);
            true
        }
        None => false,
    }
}

/// A live subscription to one conversation's messages.
///
/// Dropping the subscription or calling [`FeedSubscription::unsubscribe`]
/// tears it down: once teardown returns, the callback is never invoked
/// again.
pub struct FeedSubscription {
    conversation_id: ConversationId,
    sink: Sink,
    task: Option<JoinHandle<()>>,
    listener: Option<ListenerHandle>,
}

impl FeedSubscription {
    /// Subscribe to `conversation_id`.
    ///
    /// The callback receives the current ordered snapshot before this
    /// returns, then the updated list after every new message.
    pub async fn start<F>(
        db: &FirestoreDb,
        conversation_id: ConversationId,
        callback: F,
    ) -> Result<Self, AppError>
    where
        F: FnMut(&[Message]) + Send + 'static,
    {
        // Register before reading the snapshot so no insert falls in between.
        let watch = db.watch_messages(&conversation_id).await?;

        let snapshot = match db.list_messages(&conversation_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if let Some(listener) = watch.listener {
                    listener.shutdown().await;
                }
                return Err(e);
            }
        };

        let mut feed = MessageFeed::from_snapshot(snapshot);
        let sink: Sink = Arc::new(Mutex::new(Some(Box::new(callback))));
        deliver(&sink, feed.messages());

        let task_sink = sink.clone();
        let mut events = watch.events;
        let task = tokio::spawn(async move {
            while let Some(message) = events.recv().await {
                if feed.insert(message) && !deliver(&task_sink, feed.messages()) {
                    break;
                }
            }
        });

        tracing::debug!(conversation = %conversation_id, "Feed subscription started");

        Ok(Self {
            conversation_id,
            sink,
            task: Some(task),
            listener: watch.listener,
        })
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Whether callbacks may still be delivered.
    pub fn is_active(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Tear down the subscription and release the backend listener.
    pub async fn unsubscribe(mut self) {
        self.detach();
        if let Some(listener) = self.listener.take() {
            listener.shutdown().await;
        }
    }

    /// Stop deliveries. Waits for an in-flight callback to finish.
    fn detach(&mut self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(conversation = %self.conversation_id, "Feed subscription closed");
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.detach();
        if let Some(listener) = self.listener.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(listener.shutdown());
                }
                Err(_) => tracing::warn!(
                    conversation = %self.conversation_id,
                    "No runtime to shut down message listener"
                ),
            }
        }
    }
}

/// The conversation pane of one signed-in user.
///
/// Holds exactly one live subscription while a conversation is open.
pub struct ConversationView {
    db: FirestoreDb,
    viewer_id: String,
    active: Option<FeedSubscription>,
}

impl ConversationView {
    pub fn new(db: FirestoreDb, viewer_id: impl Into<String>) -> Self {
        Self {
            db,
            viewer_id: viewer_id.into(),
            active: None,
        }
    }

    /// Switch to the conversation with `peer_id`.
    ///
    /// The previous subscription is torn down first. If the conversation
    /// identifier cannot be derived, no subscription is established and the
    /// view stays closed.
    pub async fn open<F>(&mut self, peer_id: &str, callback: F) -> Result<&ConversationId, AppError>
    where
        F: FnMut(&[Message]) + Send + 'static,
    {
        self.close().await;

        let conversation_id = ConversationId::derive(&self.viewer_id, peer_id)?;
        let subscription = FeedSubscription::start(&self.db, conversation_id, callback).await?;
        Ok(self.active.insert(subscription).conversation_id())
    }

    /// Tear down the active subscription, if any.
    pub async fn close(&mut self) {
        if let Some(subscription) = self.active.take() {
            subscription.unsubscribe().await;
        }
    }

    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active.as_ref().map(FeedSubscription::conversation_id)
    }
}
