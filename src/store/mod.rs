//! Row store layer (PostgREST-style CRUD over HTTP).

pub mod rest;

pub use rest::RowStore;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const TRIAL_BOOKINGS: &str = "trial_bookings";
    pub const SUBSCRIPTION_BOOKINGS: &str = "subscription_bookings";
    pub const SUBSCRIPTIONS: &str = "student_subscriptions";
    pub const AVAILABILITY_SLOTS: &str = "availability_slots";
}
