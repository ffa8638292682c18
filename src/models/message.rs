// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat message model.

use serde::{Deserialize, Serialize};

/// A message stored in `chats/{conversation_id}/messages`.
///
/// Messages are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Document ID
    pub id: String,
    /// Author's user ID
    pub sender_id: String,
    /// Recipient's user ID
    pub receiver_id: String,
    /// Message body
    pub text: String,
    /// Server-assigned creation time (milliseconds since epoch)
    pub created_at: i64,
}
