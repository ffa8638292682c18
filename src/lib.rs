// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! WaveTalk: one-to-one real-time chat on top of Firebase.
//!
//! This crate provides the API the chat UI talks to: sessions, the user
//! directory, profile images and live conversation feeds. Authentication,
//! documents and files stay in Firebase.

pub mod config;
pub mod conversation;
pub mod db;
pub mod directory;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AuthService, ChatService, StorageService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub auth_service: AuthService,
    pub storage_service: StorageService,
    pub chat_service: ChatService,
}
