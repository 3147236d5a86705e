// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TutorLink: backend API for a tutoring marketplace.
//!
//! This crate provides identity provisioning (one profile per signed-in
//! identity, no matter how many instances race) and the temporal lifecycle
//! engine behind bookings, subscriptions, and tutor availability.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use config::Config;
use services::ProvisioningService;
use store::RowStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: RowStore,
    pub provisioning: ProvisioningService,
}
