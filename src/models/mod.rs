// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod message;
pub mod preferences;
pub mod user;

pub use message::Message;
pub use preferences::{Preferences, PreferencesUpdate};
pub use user::User;
