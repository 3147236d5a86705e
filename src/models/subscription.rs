//! Student subscription model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Authoritative subscription status set by the backend.
///
/// Expiry is otherwise derived from `end_date`; an explicit `Expired` here
/// always wins (admin-forced early expiry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

/// A purchased block of sessions with a validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSubscription {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub plan_id: String,
    pub start_date: NaiveDate,
    /// Immutable once set, except via an explicit renewal (out of scope)
    pub end_date: NaiveDate,
    pub total_sessions: u32,
    /// Only ever decreases over the subscription's life
    pub remaining_sessions: u32,
    pub status: SubscriptionStatus,
}
