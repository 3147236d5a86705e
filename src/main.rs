// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TutorLink API Server
//!
//! Serves the tutoring marketplace backend: identity sessions and
//! provisioning, bookings, subscriptions, and tutor availability.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutorlink::{
    config::Config,
    services::{IdentityClient, ProvisioningService},
    store::RowStore,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting TutorLink API");

    // Row store over the hosted database's REST surface
    let store = RowStore::new(&config.store_base_url, &config.store_service_key);
    tracing::info!(base_url = %config.store_base_url, "Row store initialized");

    // Identity provider client
    let identity = IdentityClient::new(&config.identity_base_url, &config.identity_api_key);

    // Provisioning service owns the per-instance profile cache and
    // per-identity locks
    let provisioning = ProvisioningService::new(identity, store.clone());
    tracing::info!("Provisioning service initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        provisioning,
    });

    // Build router
    let app = tutorlink::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tutorlink=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
