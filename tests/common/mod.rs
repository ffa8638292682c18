// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::Query,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use wavetalk::config::Config;
use wavetalk::db::FirestoreDb;
use wavetalk::models::User;
use wavetalk::routes::create_router;
use wavetalk::services::{AuthService, ChatService, IdentityClient, StorageService};
use wavetalk::AppState;

/// Identity Toolkit endpoint that refuses connections.
#[allow(dead_code)]
pub const UNREACHABLE_IDENTITY_URL: &str = "http://127.0.0.1:9";

/// Email the mock identity server reports as already registered.
#[allow(dead_code)]
pub const TAKEN_EMAIL: &str = "taken@example.com";

/// Password the mock identity server rejects.
#[allow(dead_code)]
pub const WRONG_PASSWORD: &str = "wrong-password";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create an in-memory database (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_in_memory()
}

/// Build application state around the given config, database and identity endpoint.
#[allow(dead_code)]
pub fn test_state(config: Config, db: FirestoreDb, identity_url: &str) -> Arc<AppState> {
    let identity =
        IdentityClient::with_base_url(config.firebase_api_key.clone(), identity_url.to_string());
    let auth_service = AuthService::new(
        identity,
        db.clone(),
        Arc::new(dashmap::DashMap::new()),
        config.frontend_url.clone(),
    );
    let storage_service = StorageService::from_config(&config);
    let chat_service = ChatService::new(db.clone());

    Arc::new(AppState {
        config,
        db,
        auth_service,
        storage_service,
        chat_service,
    })
}

/// Create a test app with an in-memory database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_identity(UNREACHABLE_IDENTITY_URL)
}

/// Create a test app whose identity calls go to `identity_url`.
#[allow(dead_code)]
pub fn create_test_app_with_identity(identity_url: &str) -> (axum::Router, Arc<AppState>) {
    let state = test_state(Config::test_default(), test_db_offline(), identity_url);
    (create_router(state.clone()), state)
}

/// Create a test app with a custom frontend URL (cookie attributes follow it).
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    let state = test_state(config, test_db_offline(), UNREACHABLE_IDENTITY_URL);
    (create_router(state.clone()), state)
}

/// Create a session JWT for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// `Authorization` header value for `user_id`.
#[allow(dead_code)]
pub fn bearer(state: &AppState, user_id: &str) -> String {
    format!(
        "Bearer {}",
        create_test_jwt(user_id, &state.config.jwt_signing_key)
    )
}

/// Store a profile with the given name and last activity.
#[allow(dead_code)]
pub async fn seed_user(
    state: &AppState,
    id: &str,
    name: Option<&str>,
    last_active: Option<i64>,
) -> User {
    let mut user = User::new(id, name.map(str::to_string), None, 1);
    user.last_active = last_active;
    state.db.upsert_user(&user).await.unwrap();
    user
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ─── Mock Identity Toolkit ───────────────────────────────────

fn mock_user_id(email: &str) -> String {
    format!("uid-{}", email.replace(['@', '.'], "-"))
}

fn rejection(code: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "code": 400, "message": code } })),
    )
        .into_response()
}

fn session(local_id: &str, email: Option<&str>, extra: Value) -> axum::response::Response {
    let mut body = json!({
        "localId": local_id,
        "idToken": format!("id-token-{local_id}"),
        "refreshToken": "refresh",
        "expiresIn": "3600",
    });
    if let Some(email) = email {
        body["email"] = json!(email);
    }
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    Json(body).into_response()
}

async fn mock_identity(
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if query.get("key").map(String::as_str) != Some("test_api_key") {
        return rejection("API key not valid. Please pass a valid API key.");
    }

    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    match uri.path().rsplit('/').next().unwrap_or_default() {
        "accounts:signUp" if email == TAKEN_EMAIL => rejection("EMAIL_EXISTS"),
        "accounts:signUp" if password.len() < 6 => {
            rejection("WEAK_PASSWORD : Password should be at least 6 characters")
        }
        "accounts:signUp" => session(&mock_user_id(email), Some(email), json!({})),
        "accounts:signInWithPassword" if password == WRONG_PASSWORD => {
            rejection("INVALID_LOGIN_CREDENTIALS")
        }
        "accounts:signInWithPassword" => session(&mock_user_id(email), Some(email), json!({})),
        "accounts:signInWithIdp" => {
            let post_body = body["postBody"].as_str().unwrap_or_default();
            if !post_body.contains("providerId=google.com") {
                return rejection("INVALID_IDP_RESPONSE");
            }
            session(
                "google-uid",
                Some("gina@example.com"),
                json!({
                    "displayName": "Gina Google",
                    "photoUrl": "https://example.com/gina.png",
                    "isNewUser": true,
                }),
            )
        }
        _ => (StatusCode::NOT_FOUND, "unknown method").into_response(),
    }
}

/// Start a mock Identity Toolkit server and return its base URL.
#[allow(dead_code)]
pub async fn spawn_mock_identity() -> String {
    let app = Router::new().fallback(mock_identity);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/v1", addr)
}

/// Poll until `condition` holds, or panic after about a second.
#[allow(dead_code)]
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
