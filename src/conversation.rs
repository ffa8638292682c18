// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical conversation identifiers.
//!
//! A one-to-one conversation is addressed by a single key that both
//! participants compute identically: the two user IDs sorted
//! lexicographically and joined with [`SEPARATOR`].

use serde::Serialize;
use std::fmt;

/// Separator placed between the two sorted participant IDs.
pub const SEPARATOR: char = '_';

/// Errors from deriving a conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("participant id must not be empty")]
    EmptyParticipant,
}

/// Identifier of the message thread between exactly two participants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the conversation identifier for participants `a` and `b`.
    ///
    /// The result does not depend on argument order. Deriving for the same
    /// participant twice (self-chat) yields `"<id>_<id>"`.
    pub fn derive(a: &str, b: &str) -> Result<Self, ConversationError> {
        if a.trim().is_empty() || b.trim().is_empty() {
            return Err(ConversationError::EmptyParticipant);
        }

        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self(format!("{first}{SEPARATOR}{second}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
