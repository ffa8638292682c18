// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

/// Display name shown for profiles that never set one.
pub const DEFAULT_DISPLAY_NAME: &str = "No Name";

/// Avatar shown for profiles without an uploaded image.
pub const DEFAULT_AVATAR: &str = "/profiled.png";

/// User profile stored in Firestore.
///
/// Every field except `id` may be absent in older documents, so reads go
/// through the accessor methods which apply the display defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Firebase Auth `localId` (also used as document ID)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address used to sign up
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number entered at signup
    #[serde(default)]
    pub phone: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[serde(default)]
    pub dob: Option<String>,
    /// Profile image: download URL or inline `data:` URL
    #[serde(default)]
    pub avatar: Option<String>,
    /// Last activity (milliseconds since epoch)
    #[serde(default)]
    pub last_active: Option<i64>,
    /// When the profile was created (milliseconds since epoch)
    #[serde(default)]
    pub created_at: i64,
}

impl User {
    /// Create a fresh profile for a newly registered account.
    pub fn new(id: impl Into<String>, name: Option<String>, email: Option<String>, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            name,
            email,
            phone: None,
            dob: None,
            avatar: None,
            last_active: Some(now_ms),
            created_at: now_ms,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    pub fn avatar_url(&self) -> &str {
        self.avatar
            .as_deref()
            .filter(|avatar| !avatar.is_empty())
            .unwrap_or(DEFAULT_AVATAR)
    }

    /// Last activity timestamp, with missing activity treated as 0.
    pub fn activity(&self) -> i64 {
        self.last_active.unwrap_or(0)
    }
}
