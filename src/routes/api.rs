// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile, directory and preference routes.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::directory::directory_view;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Preferences, PreferencesUpdate, User};
use crate::time_utils::format_millis_rfc3339;
use crate::AppState;

/// Extra room over the image cap so the handler sees oversized uploads
/// and can answer with its own message.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

pub fn routes(config: &Config) -> Router<Arc<AppState>> {
    let upload_limit = config.max_upload_bytes.saturating_add(UPLOAD_BODY_SLACK);

    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/users", get(list_users))
        .route(
            "/api/profile/image",
            post(upload_profile_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/profile/image/skip", post(skip_profile_image))
        .route(
            "/api/preferences",
            get(get_preferences).patch(update_preferences),
        )
}

// ─── Responses ───────────────────────────────────────────────

/// Profile as shown to the UI, with display defaults applied.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Last activity (milliseconds since epoch, 0 if never recorded)
    pub last_active: i64,
    pub last_active_at: Option<String>,
    /// Only present on the caller's own profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserResponse {
    /// Directory entry for another user.
    pub fn public(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name().to_string(),
            avatar: user.avatar_url().to_string(),
            last_active: user.activity(),
            last_active_at: user.last_active.and_then(format_millis_rfc3339),
            email: None,
        }
    }

    /// The caller's own profile.
    pub fn own(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            ..Self::public(user)
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DirectoryResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub search: String,
}

// ─── Handlers ────────────────────────────────────────────────

async fn load_profile(state: &AppState, user_id: &str) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
}

/// Get current user's profile
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = load_profile(&state, &auth.user_id).await?;
    Ok(Json(UserResponse::own(&user)))
}

/// Everyone except the caller, most recently active first.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<DirectoryResponse>> {
    let users: Vec<User> = state
        .db
        .list_users()
        .await?
        .into_iter()
        .filter(|user| user.id != auth.user_id)
        .collect();

    let users: Vec<UserResponse> = directory_view(&users, &query.search)
        .into_iter()
        .map(UserResponse::public)
        .collect();

    Ok(Json(DirectoryResponse {
        total: users.len(),
        users,
    }))
}

/// Upload a new profile image (raw body, `Content-Type: image/*`).
async fn upload_profile_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UserResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let content_type = state.storage_service.validate(content_type, &body)?;

    let mut user = load_profile(&state, &auth.user_id).await?;

    let id_token = if state.storage_service.requires_id_token() {
        Some(
            state
                .auth_service
                .cached_id_token(&auth.user_id)
                .ok_or(AppError::InvalidToken)?,
        )
    } else {
        None
    };

    let avatar = state
        .storage_service
        .store_profile_image(&auth.user_id, &content_type, body.to_vec(), id_token.as_deref())
        .await?;

    user.avatar = Some(avatar);
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %auth.user_id, bytes = body.len(), "Profile image updated");
    Ok(Json(UserResponse::own(&user)))
}

/// Continue without an image: the placeholder avatar is used.
async fn skip_profile_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let mut user = load_profile(&state, &auth.user_id).await?;

    if user.avatar.is_some() {
        user.avatar = None;
        state.db.upsert_user(&user).await?;
    }

    Ok(Json(UserResponse::own(&user)))
}

async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Preferences>> {
    Ok(Json(state.db.get_preferences(&auth.user_id).await?))
}

/// Apply a partial update; each UI toggle sends one field.
async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>> {
    if update.is_empty() {
        return Err(AppError::BadRequest("No preference fields given".to_string()));
    }

    let mut prefs = state.db.get_preferences(&auth.user_id).await?;
    update.apply(&mut prefs);
    state.db.set_preferences(&auth.user_id, &prefs).await?;

    Ok(Json(prefs))
}
