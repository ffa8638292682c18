// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Identity Toolkit REST client.
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - Google federated sign-in (ID token exchange)
//! - Mapping provider rejections (e.g. `EMAIL_EXISTS`) to user-facing errors

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Successful sign-in / sign-up response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySession {
    /// Firebase user ID
    pub local_id: String,
    /// Firebase ID token (JWT, ~1 hour lifetime)
    pub id_token: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// ID token lifetime in seconds, as a decimal string
    #[serde(default)]
    pub expires_in: Option<String>,
    /// Set by `signInWithIdp` when the federated account was just created
    #[serde(default)]
    pub is_new_user: Option<bool>,
}

impl IdentitySession {
    /// ID token lifetime, defaulting to Firebase's one hour.
    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityClient {
    /// Create a client against the production Identity Toolkit.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_URL.to_string())
    }

    /// Create a client against a custom endpoint (emulator, tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a client honoring `FIREBASE_AUTH_EMULATOR_HOST`.
    pub fn from_config(config: &Config) -> Self {
        match &config.auth_emulator_host {
            Some(host) => {
                tracing::info!(host = %host, "Using Identity Toolkit emulator");
                Self::with_base_url(
                    config.firebase_api_key.clone(),
                    format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                )
            }
            None => Self::new(config.firebase_api_key.clone()),
        }
    }

    /// Create an email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        self.post("accounts:signUp", &body).await
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        self.post("accounts:signInWithPassword", &body).await
    }

    /// Exchange a Google ID token for a Firebase session.
    pub async fn sign_in_with_google(
        &self,
        google_id_token: &str,
        request_uri: &str,
    ) -> Result<IdentitySession, AppError> {
        let body = serde_json::json!({
            "postBody": format!(
                "id_token={}&providerId=google.com",
                urlencoding::encode(google_id_token)
            ),
            "requestUri": request_uri,
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });
        self.post("accounts:signInWithIdp", &body).await
    }

    async fn post(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<IdentitySession, AppError> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)));
        }

        let text = response.text().await.unwrap_or_default();
        let code = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .ok();

        match code {
            Some(code) if status.is_client_error() => {
                tracing::info!(method, code = %code, "Identity provider rejected request");
                Err(AppError::AuthRejected(describe_rejection(&code)))
            }
            _ => Err(AppError::Identity(format!("HTTP {}: {}", status, text))),
        }
    }
}

/// Turn an Identity Toolkit error code into a message fit for the UI.
///
/// Codes may carry a suffix (`WEAK_PASSWORD : Password should be ...`).
pub fn describe_rejection(code: &str) -> String {
    let key = code.split(':').next().unwrap_or(code).trim();
    match key {
        "EMAIL_EXISTS" => "An account with this email already exists.".to_string(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Login failed. Please check your credentials.".to_string()
        }
        "USER_DISABLED" => "This account has been disabled.".to_string(),
        "WEAK_PASSWORD" => "Password should be at least 6 characters.".to_string(),
        "INVALID_EMAIL" => "Invalid email address.".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Try again later.".to_string(),
        "INVALID_IDP_RESPONSE" => "Google login failed. Try again.".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_rejection_known_codes() {
        assert_eq!(
            describe_rejection("EMAIL_EXISTS"),
            "An account with this email already exists."
        );
        assert_eq!(
            describe_rejection("INVALID_LOGIN_CREDENTIALS"),
            "Login failed. Please check your credentials."
        );
        assert_eq!(
            describe_rejection("WEAK_PASSWORD : Password should be at least 6 characters"),
            "Password should be at least 6 characters."
        );
    }

    #[test]
    fn test_describe_rejection_passes_unknown_through() {
        assert_eq!(describe_rejection("OPERATION_NOT_ALLOWED"), "OPERATION_NOT_ALLOWED");
    }

    #[test]
    fn test_session_expiry_parsing() {
        let session: IdentitySession = serde_json::from_str(
            r#"{"localId": "u1", "idToken": "t", "expiresIn": "1800"}"#,
        )
        .unwrap();
        assert_eq!(session.expires_in_secs(), 1800);

        let session: IdentitySession =
            serde_json::from_str(r#"{"localId": "u1", "idToken": "t"}"#).unwrap();
        assert_eq!(session.expires_in_secs(), 3600);
    }

    #[test]
    fn test_emulator_base_url() {
        let mut config = Config::test_default();
        config.auth_emulator_host = Some("localhost:9099".to_string());

        let client = IdentityClient::from_config(&config);
        assert_eq!(
            client.base_url,
            "http://localhost:9099/identitytoolkit.googleapis.com/v1"
        );
    }
}
