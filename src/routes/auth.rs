// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: signup, login, Google sign-in, session and logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    create_jwt, session_token, verify_jwt, SESSION_COOKIE, SESSION_TTL_SECS,
};
use crate::models::User;
use crate::routes::api::UserResponse;
use crate::services::SignUpProfile;
use crate::AppState;

/// Cookie remembering the last email for the login form.
pub const REMEMBERED_EMAIL_COOKIE: &str = "wavetalk_email";

const REMEMBERED_EMAIL_TTL_DAYS: i64 = 365;

/// Where the UI should go for a signed-in user.
pub const CHATROOM_PATH: &str = "/chatroom";
/// Where the UI should go without a session.
pub const HOME_PATH: &str = "/";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/session", get(session))
        .route("/auth/logout", post(logout))
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    pub password: String,
    #[validate(length(max = 20, message = "Phone number too long"))]
    #[serde(default)]
    pub phone: Option<String>,
    /// Date of birth, YYYY-MM-DD
    #[serde(default)]
    pub dob: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    /// Google ID token obtained by the browser
    #[serde(default)]
    pub id_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<UserResponse>,
    /// Page the UI should be on
    pub redirect: String,
    /// Email saved by "Remember Me"
    pub remembered_email: Option<String>,
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

fn remembered_email_cookie(email: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REMEMBERED_EMAIL_COOKIE, email))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(REMEMBERED_EMAIL_TTL_DAYS))
        .build()
}

/// Removal cookie; attributes must match the ones used at creation.
fn expired(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build(name)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Issue a session for `user` and attach the session cookie.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(&user.id, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies()));

    Ok((
        jar,
        Json(SessionResponse {
            token,
            user: UserResponse::own(user),
        }),
    ))
}

// ─── Handlers ────────────────────────────────────────────────

/// Create an email/password account and its profile, then sign in.
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    req.validate()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let dob = req
        .dob
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map(|date| date.format("%Y-%m-%d").to_string())
                .map_err(|_| AppError::Validation("Date of birth must be YYYY-MM-DD".to_string()))
        })
        .transpose()?;

    let profile = SignUpProfile {
        name: name.to_string(),
        email: req.email.trim().to_string(),
        password: req.password,
        phone: req
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        dob,
    };

    let user = state.auth_service.sign_up(&profile).await?;
    let (jar, body) = start_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, body))
}

/// Sign in with email and password.
///
/// With `remember_me` the email is kept in a cookie for the next visit;
/// without it any remembered email is cleared.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Both fields are required!".to_string()));
    }

    let user = state.auth_service.sign_in(email, &req.password).await?;
    tracing::info!(user_id = %user.id, "User signed in");

    let jar = if req.remember_me {
        jar.add(remembered_email_cookie(
            email.to_string(),
            state.config.secure_cookies(),
        ))
    } else {
        jar.remove(expired(
            REMEMBERED_EMAIL_COOKIE,
            state.config.secure_cookies(),
        ))
    };

    start_session(&state, jar, &user)
}

/// Sign in with Google (federated).
async fn google_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let id_token = req.id_token.trim();
    if id_token.is_empty() {
        return Err(AppError::Validation("Missing Google ID token".to_string()));
    }

    let user = state.auth_service.sign_in_with_google(id_token).await?;
    tracing::info!(user_id = %user.id, "User signed in with Google");

    start_session(&state, jar, &user)
}

/// Report whether the caller has a session, and where the UI belongs.
async fn session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>> {
    let remembered_email = jar
        .get(REMEMBERED_EMAIL_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let user_id = session_token(&jar, &headers)
        .and_then(|token| verify_jwt(&token, &state.config.jwt_signing_key));

    let user = match user_id {
        Some(user_id) => state.db.get_user(&user_id).await?,
        None => None,
    };

    let authenticated = user.is_some();
    Ok(Json(SessionStatus {
        authenticated,
        user: user.as_ref().map(UserResponse::own),
        redirect: if authenticated { CHATROOM_PATH } else { HOME_PATH }.to_string(),
        remembered_email,
    }))
}

/// Logout: clear the session cookie and cached credentials.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (StatusCode, CookieJar) {
    if let Some(user_id) = session_token(&jar, &headers)
        .and_then(|token| verify_jwt(&token, &state.config.jwt_signing_key))
    {
        state.auth_service.forget(&user_id);
        tracing::info!(user_id = %user_id, "User signed out");
    }

    let secure = state.config.secure_cookies();
    (StatusCode::NO_CONTENT, jar.remove(expired(SESSION_COOKIE, secure)))
}
