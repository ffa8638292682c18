// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup, login and session tests against a mock Identity Toolkit.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn cookie_pair(set_cookies: &[String], name: &str) -> Option<String> {
    set_cookies
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn signup(app: &Router, name: &str, email: &str) -> Response {
    app.clone()
        .oneshot(post_json(
            "/auth/signup",
            json!({
                "name": name,
                "email": email,
                "password": "secret123",
                "phone": "555-0100",
                "dob": "1990-04-01",
            }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_signup_creates_profile_and_session() {
    let identity = common::spawn_mock_identity().await;
    let (app, state) = common::create_test_app_with_identity(&identity);

    let response = signup(&app, "Ana", "ana@example.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookies = set_cookies(&response);
    let session = cookie_pair(&cookies, "wavetalk_token").expect("session cookie");

    let body = common::json_body(response).await;
    assert_eq!(body["user"]["id"], "uid-ana-example-com");
    assert_eq!(body["user"]["name"], "Ana");
    assert_eq!(body["user"]["avatar"], "/profiled.png");

    let stored = state
        .db
        .get_user("uid-ana-example-com")
        .await
        .unwrap()
        .expect("profile stored");
    assert_eq!(stored.email.as_deref(), Some("ana@example.com"));
    assert_eq!(stored.phone.as_deref(), Some("555-0100"));
    assert_eq!(stored.dob.as_deref(), Some("1990-04-01"));

    // ID token kept for uploads
    assert_eq!(
        state
            .auth_service
            .cached_id_token("uid-ana-example-com")
            .as_deref(),
        Some("id-token-uid-ana-example-com")
    );

    // The session cookie opens the chatroom
    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, session)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = common::json_body(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["redirect"], "/chatroom");
}

#[tokio::test]
async fn test_signup_existing_email_rejected() {
    let identity = common::spawn_mock_identity().await;
    let (app, state) = common::create_test_app_with_identity(&identity);

    let response = signup(&app, "Ana", common::TAKEN_EMAIL).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());

    let body = common::json_body(response).await;
    assert_eq!(body["error"], "auth_rejected");
    assert_eq!(
        body["details"],
        "An account with this email already exists."
    );

    assert!(state.db.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signup_validation_happens_before_identity_call() {
    // Unreachable identity server: any call would be a 502
    let (app, _) = common::create_test_app();

    for body in [
        json!({"name": "Ana", "email": "not-an-email", "password": "secret123"}),
        json!({"name": "   ", "email": "ana@example.com", "password": "secret123"}),
        json!({"name": "Ana", "email": "ana@example.com", "password": "123"}),
        json!({"name": "Ana", "email": "ana@example.com", "password": "secret123", "dob": "01/04/1990"}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/auth/signup", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn test_login_remember_me_sets_email_cookie() {
    let identity = common::spawn_mock_identity().await;
    let (app, _) = common::create_test_app_with_identity(&identity);
    signup(&app, "Ana", "ana@example.com").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"email": " ana@example.com ", "password": "secret123", "remember_me": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookie_pair(&cookies, "wavetalk_token").is_some());
    let remembered = cookie_pair(&cookies, "wavetalk_email").expect("remembered email");
    assert!(remembered.contains("ana"));

    // Session status reports the remembered email even without a session
    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, remembered)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = common::json_body(response).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["redirect"], "/");
    assert_eq!(body["remembered_email"], "ana@example.com");
}

#[tokio::test]
async fn test_login_without_remember_me_clears_email_cookie() {
    let identity = common::spawn_mock_identity().await;
    let (app, _) = common::create_test_app_with_identity(&identity);
    signup(&app, "Ana", "ana@example.com").await;

    let mut request = post_json(
        "/auth/login",
        json!({"email": "ana@example.com", "password": "secret123", "remember_me": false}),
    );
    request.headers_mut().insert(
        header::COOKIE,
        "wavetalk_email=old@example.com".parse().unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let removal = cookies
        .iter()
        .find(|value| value.starts_with("wavetalk_email="))
        .expect("removal cookie");
    assert!(removal.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let identity = common::spawn_mock_identity().await;
    let (app, _) = common::create_test_app_with_identity(&identity);

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "ana@example.com", "password": common::WRONG_PASSWORD}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::json_body(response).await;
    assert_eq!(
        body["details"],
        "Login failed. Please check your credentials."
    );
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "ana@example.com", "password": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(response).await;
    assert_eq!(body["details"], "Both fields are required!");
}

#[tokio::test]
async fn test_login_creates_missing_profile() {
    let identity = common::spawn_mock_identity().await;
    let (app, state) = common::create_test_app_with_identity(&identity);

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "legacy@example.com", "password": "secret123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = state
        .db
        .get_user("uid-legacy-example-com")
        .await
        .unwrap()
        .expect("profile created");
    assert_eq!(stored.display_name(), "No Name");
    assert!(stored.activity() > 0);
}

#[tokio::test]
async fn test_google_login_creates_profile_from_provider() {
    let identity = common::spawn_mock_identity().await;
    let (app, state) = common::create_test_app_with_identity(&identity);

    let response = app
        .oneshot(post_json("/auth/google", json!({"id_token": "google-jwt"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::json_body(response).await;
    assert_eq!(body["user"]["name"], "Gina Google");
    assert_eq!(body["user"]["avatar"], "https://example.com/gina.png");
    assert_eq!(body["user"]["email"], "gina@example.com");

    assert!(state.db.get_user("google-uid").await.unwrap().is_some());
}

#[tokio::test]
async fn test_google_login_requires_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_json("/auth/google", json!({"id_token": " "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identity_outage_is_bad_gateway() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "ana@example.com", "password": "secret123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_logout_forgets_id_token() {
    let identity = common::spawn_mock_identity().await;
    let (app, state) = common::create_test_app_with_identity(&identity);

    let response = signup(&app, "Ana", "ana@example.com").await;
    let session = cookie_pair(&set_cookies(&response), "wavetalk_token").unwrap();
    assert!(state
        .auth_service
        .cached_id_token("uid-ana-example-com")
        .is_some());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, session)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(state
        .auth_service
        .cached_id_token("uid-ana-example-com")
        .is_none());
}
