// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account service: sign-up, sign-in and profile bootstrapping.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::services::identity::{IdentityClient, IdentitySession};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Margin before ID token expiration after which it is no longer handed out.
const ID_TOKEN_MARGIN_SECS: i64 = 60;

/// Firebase ID token kept for calls made on the user's behalf (uploads).
#[derive(Clone)]
pub struct CachedIdToken {
    id_token: String,
    expires_at: DateTime<Utc>,
}

/// Shared ID token cache, keyed by user ID.
pub type IdTokenCache = Arc<DashMap<String, CachedIdToken>>;

/// Fields collected by the signup form.
#[derive(Debug, Clone)]
pub struct SignUpProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub dob: Option<String>,
}

/// High-level account operations backed by Identity Toolkit and Firestore.
#[derive(Clone)]
pub struct AuthService {
    identity: IdentityClient,
    db: FirestoreDb,
    id_tokens: IdTokenCache,
    /// Redirect URI reported to Identity Toolkit for federated sign-in
    request_uri: String,
}

impl AuthService {
    pub fn new(
        identity: IdentityClient,
        db: FirestoreDb,
        id_tokens: IdTokenCache,
        request_uri: String,
    ) -> Self {
        Self {
            identity,
            db,
            id_tokens,
            request_uri,
        }
    }

    /// Register a new account and create its profile document.
    pub async fn sign_up(&self, profile: &SignUpProfile) -> Result<User, AppError> {
        let session = self
            .identity
            .sign_up(&profile.email, &profile.password)
            .await?;
        self.remember(&session);

        let mut user = User::new(
            session.local_id.clone(),
            Some(profile.name.clone()),
            Some(profile.email.clone()),
            Utc::now().timestamp_millis(),
        );
        user.phone = profile.phone.clone();
        user.dob = profile.dob.clone();

        self.db.upsert_user(&user).await?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError> {
        let session = self.identity.sign_in_with_password(email, password).await?;
        self.remember(&session);
        self.ensure_profile(&session).await
    }

    /// Sign in with a Google ID token, creating the profile on first use.
    pub async fn sign_in_with_google(&self, google_id_token: &str) -> Result<User, AppError> {
        let session = self
            .identity
            .sign_in_with_google(google_id_token, &self.request_uri)
            .await?;
        self.remember(&session);
        self.ensure_profile(&session).await
    }

    /// Load the profile for a fresh session and record the activity.
    ///
    /// Accounts without a profile document (e.g. first federated sign-in)
    /// get one built from the provider's data.
    async fn ensure_profile(&self, session: &IdentitySession) -> Result<User, AppError> {
        let now = Utc::now().timestamp_millis();

        let user = match self.db.get_user(&session.local_id).await? {
            Some(mut user) => {
                user.last_active = Some(now.max(user.activity()));
                user
            }
            None => {
                tracing::info!(
                    user_id = %session.local_id,
                    new_account = session.is_new_user.unwrap_or(false),
                    "Creating profile on first sign-in"
                );
                let mut user = User::new(
                    session.local_id.clone(),
                    session.display_name.clone(),
                    session.email.clone(),
                    now,
                );
                user.avatar = session.photo_url.clone();
                user
            }
        };

        self.db.upsert_user(&user).await?;
        Ok(user)
    }

    fn remember(&self, session: &IdentitySession) {
        self.id_tokens.insert(
            session.local_id.clone(),
            CachedIdToken {
                id_token: session.id_token.clone(),
                expires_at: Utc::now() + Duration::seconds(session.expires_in_secs()),
            },
        );
    }

    /// The user's Firebase ID token, if one is cached and not about to expire.
    pub fn cached_id_token(&self, user_id: &str) -> Option<String> {
        let cached = self.id_tokens.get(user_id)?;
        if Utc::now() + Duration::seconds(ID_TOKEN_MARGIN_SECS) < cached.expires_at {
            Some(cached.id_token.clone())
        } else {
            None
        }
    }

    /// Drop any cached credentials for a user (logout).
    pub fn forget(&self, user_id: &str) {
        self.id_tokens.remove(user_id);
    }
}
