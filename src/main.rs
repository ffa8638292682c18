// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WaveTalk API Server
//!
//! One-to-one real-time chat. Accounts live in Firebase Authentication,
//! profiles and messages in Firestore, profile images in Firebase Storage.

use dashmap::DashMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wavetalk::{
    config::Config,
    db::FirestoreDb,
    services::{AuthService, ChatService, IdentityClient, StorageService},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting WaveTalk API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let identity = IdentityClient::from_config(&config);

    // ID tokens are kept per instance for uploads made on the user's behalf
    let id_tokens = Arc::new(DashMap::new());
    let auth_service = AuthService::new(
        identity,
        db.clone(),
        id_tokens,
        config.frontend_url.clone(),
    );

    let storage_service = StorageService::from_config(&config);
    let chat_service = ChatService::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        auth_service,
        storage_service,
        chat_service,
    });

    // Build router
    let app = wavetalk::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wavetalk=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
