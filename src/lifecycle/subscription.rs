// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription usage progress and expiry classification.

use crate::models::{StudentSubscription, SubscriptionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How close to the end of its validity window a subscription is within the
/// last week of its life.
const EXPIRING_WINDOW_DAYS: i64 = 7;

/// Derived expiry phase. Exactly one applies to any `(sub, now)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPhase {
    Active,
    Expiring,
    Expired,
}

/// Percentage of sessions used, in `[0, 100]`.
///
/// `0` when `total_sessions == 0`; a `remaining > total` row (which the
/// backend should never produce) clamps to `0` used rather than going
/// negative.
pub fn progress(sub: &StudentSubscription) -> f64 {
    if sub.total_sessions == 0 {
        return 0.0;
    }
    let used = sub.total_sessions.saturating_sub(sub.remaining_sessions);
    (used as f64 / sub.total_sessions as f64) * 100.0
}

/// Classify a subscription against an explicit "now".
///
/// The backend's authoritative `expired` status always wins, even when the
/// date math says otherwise (admin-forced early expiry). Otherwise expiry is
/// derived from `end_date`, with a 7-day inclusive "expiring" window.
pub fn classify(sub: &StudentSubscription, now: DateTime<Utc>) -> SubscriptionPhase {
    if sub.status == SubscriptionStatus::Expired {
        return SubscriptionPhase::Expired;
    }

    let days_until = (sub.end_date - now.date_naive()).num_days();
    if days_until < 0 {
        SubscriptionPhase::Expired
    } else if days_until <= EXPIRING_WINDOW_DAYS {
        SubscriptionPhase::Expiring
    } else {
        SubscriptionPhase::Active
    }
}
