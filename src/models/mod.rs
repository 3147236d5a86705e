// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod availability;
pub mod booking;
pub mod identity;
pub mod profile;
pub mod subscription;

pub use availability::{AvailabilitySlot, NewAvailabilitySlot};
pub use booking::{
    BookingKind, BookingStatus, NewSubscriptionBooking, NewTrialBooking, SubscriptionBookingRow,
    TrialBookingRow, UnifiedBooking,
};
pub use identity::{ExternalAccount, Identity};
pub use profile::{Profile, ProfileType, ProfileUpdate};
pub use subscription::{StudentSubscription, SubscriptionStatus};
