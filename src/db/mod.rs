// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory backend for offline use).

pub mod firestore;
pub mod memory;

pub use firestore::{FirestoreDb, ListenerHandle, MessageWatch};
pub use memory::MemoryStore;

use crate::error::AppError;
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PREFERENCES: &str = "preferences";
    /// Parent collection of per-conversation message threads
    pub const CHATS: &str = "chats";
    /// Sub-collection under `chats/{conversation_id}`
    pub const MESSAGES: &str = "messages";
}

const DOCUMENT_ID_BYTES: usize = 16;

/// Generate a random document ID (32 hex characters).
pub fn new_document_id() -> Result<String, AppError> {
    let mut bytes = [0u8; DOCUMENT_ID_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}
