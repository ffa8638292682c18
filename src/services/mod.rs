// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod chat;
pub mod identity;
pub mod storage;

pub use auth::{AuthService, IdTokenCache, SignUpProfile};
pub use chat::ChatService;
pub use identity::{IdentityClient, IdentitySession};
pub use storage::{ImageStorage, StorageService};
