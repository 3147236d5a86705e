// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod identity;
pub mod provisioning;

pub use identity::{IdentityClient, SessionResult, SessionStatus};
pub use provisioning::{ProvisioningService, SessionSnapshot, SignInOutcome, SignUpOutcome};
