// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Temporal lifecycle engine.
//!
//! Pure functions over the data model, re-evaluated against an explicit
//! "now" supplied by the caller. Nothing in here reads the system clock or
//! performs I/O; screens poll where live countdowns are needed.

pub mod availability;
pub mod booking;
pub mod countdown;
pub mod subscription;
pub mod time;

pub use availability::{check_slot, has_overlap, validate_slot, SlotCandidate, SlotError};
pub use booking::{unify_subscription, unify_trial};
pub use countdown::countdown;
pub use subscription::{classify, progress, SubscriptionPhase};
pub use time::{minutes_between, ClockTime, TimeError};
