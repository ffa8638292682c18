// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, activity touches)
//! - Preferences (persisted UI state)
//! - Messages (ordered per-conversation threads and live listeners)

use crate::conversation::ConversationId;
use crate::db::collections;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{Message, Preferences, User};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Target ID for message listeners. Each listener owns a single target.
const MESSAGE_LISTENER_TARGET: u32 = 1;

type FirestoreMessageListener =
    firestore::FirestoreListener<firestore::FirestoreDb, firestore::FirestoreMemListenStateStorage>;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

/// Live stream of messages inserted into one conversation.
///
/// Documents already present when the watch starts may be re-delivered by
/// Firestore; consumers deduplicate by message ID.
pub struct MessageWatch {
    pub events: mpsc::UnboundedReceiver<Message>,
    pub listener: Option<ListenerHandle>,
}

/// Owns a running Firestore listen stream.
pub struct ListenerHandle {
    listener: FirestoreMessageListener,
}

impl ListenerHandle {
    /// Stop the listen stream and wait for its background task to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.listener.shutdown().await {
            tracing::warn!(error = %e, "Failed to shut down message listener");
        }
    }
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database (offline mode, tests).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    /// The in-memory store, when running offline.
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &self.backend {
            Backend::Memory(store) => Some(store.as_ref()),
            Backend::Firestore(_) => None,
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.get_user(user_id)),
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(user_id)
                .await
                .map_err(db_err),
        }
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(store) => store.upsert_user(user),
            Backend::Firestore(client) => {
                let _: User = client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&user.id)
                    .object(user)
                    .execute()
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }

    /// List every user profile.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.list_users()),
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collections::USERS)
                .obj()
                .query()
                .await
                .map_err(db_err),
        }
    }

    /// Record activity for a user.
    ///
    /// Fetch-modify-write so other profile fields are preserved. Missing
    /// profiles are left alone.
    pub async fn touch_user(&self, user_id: &str, at_ms: i64) -> Result<(), AppError> {
        let Some(mut user) = self.get_user(user_id).await? else {
            tracing::debug!(user_id, "No profile to touch");
            return Ok(());
        };

        if user.activity() >= at_ms {
            return Ok(());
        }
        user.last_active = Some(at_ms);
        self.upsert_user(&user).await
    }

    // ─── Preferences Operations ──────────────────────────────────

    /// Get stored preferences, falling back to defaults.
    pub async fn get_preferences(&self, user_id: &str) -> Result<Preferences, AppError> {
        let stored = match &self.backend {
            Backend::Memory(store) => store.get_preferences(user_id),
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::PREFERENCES)
                .obj()
                .one(user_id)
                .await
                .map_err(db_err)?,
        };
        Ok(stored.unwrap_or_default())
    }

    /// Store preferences.
    pub async fn set_preferences(&self, user_id: &str, prefs: &Preferences) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(store) => store.set_preferences(user_id, *prefs),
            Backend::Firestore(client) => {
                let _: Preferences = client
                    .fluent()
                    .update()
                    .in_col(collections::PREFERENCES)
                    .document_id(user_id)
                    .object(prefs)
                    .execute()
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }

    // ─── Message Operations ──────────────────────────────────────

    /// Get all messages of a conversation ordered by ascending `created_at`.
    pub async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, AppError> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.list_messages(conversation_id)),
            Backend::Firestore(client) => {
                let parent_path = client
                    .parent_path(collections::CHATS, conversation_id.as_str())
                    .map_err(db_err)?;

                client
                    .fluent()
                    .select()
                    .from(collections::MESSAGES)
                    .parent(&parent_path)
                    .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
                    .obj()
                    .query()
                    .await
                    .map_err(db_err)
            }
        }
    }

    /// Store a new message in its conversation thread.
    pub async fn add_message(
        &self,
        conversation_id: &ConversationId,
        message: &Message,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(store) => store.add_message(conversation_id, message),
            Backend::Firestore(client) => {
                let parent_path = client
                    .parent_path(collections::CHATS, conversation_id.as_str())
                    .map_err(db_err)?;

                let _: Message = client
                    .fluent()
                    .insert()
                    .into(collections::MESSAGES)
                    .document_id(&message.id)
                    .parent(&parent_path)
                    .object(message)
                    .execute()
                    .await
                    .map_err(db_err)?;
            }
        }

        tracing::debug!(
            conversation = %conversation_id,
            message_id = %message.id,
            "Message stored"
        );
        Ok(())
    }

    /// Start watching a conversation for inserted messages.
    pub async fn watch_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<MessageWatch, AppError> {
        match &self.backend {
            Backend::Memory(store) => Ok(MessageWatch {
                events: store.watch_messages(conversation_id),
                listener: None,
            }),
            Backend::Firestore(client) => {
                let parent_path = client
                    .parent_path(collections::CHATS, conversation_id.as_str())
                    .map_err(db_err)?;

                let mut listener = client
                    .create_listener(firestore::FirestoreMemListenStateStorage::new())
                    .await
                    .map_err(db_err)?;

                client
                    .fluent()
                    .select()
                    .from(collections::MESSAGES)
                    .parent(&parent_path)
                    .listen()
                    .add_target(
                        firestore::FirestoreListenerTarget::new(MESSAGE_LISTENER_TARGET),
                        &mut listener,
                    )
                    .map_err(db_err)?;

                let (tx, rx) = mpsc::unbounded_channel();
                listener
                    .start(move |event| {
                        let tx = tx.clone();
                        async move {
                            if let firestore::FirestoreListenEvent::DocumentChange(ref change) =
                                event
                            {
                                if let Some(doc) = &change.document {
                                    match firestore::FirestoreDb::deserialize_doc_to::<Message>(doc)
                                    {
                                        Ok(message) => {
                                            let _ = tx.send(message);
                                        }
                                        Err(e) => tracing::warn!(
                                            error = %e,
                                            "Skipping undecodable message document"
                                        ),
                                    }
                                }
                            }
                            Ok(())
                        }
                    })
                    .await
                    .map_err(db_err)?;

                tracing::debug!(conversation = %conversation_id, "Message listener started");

                Ok(MessageWatch {
                    events: rx,
                    listener: Some(ListenerHandle { listener }),
                })
            }
        }
    }
}
