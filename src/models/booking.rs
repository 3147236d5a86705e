// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lesson booking rows and the unified view over both kinds.

use crate::lifecycle::time::ClockTime;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Booking lifecycle status. Bookings are never deleted; they transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// Which underlying table a booking came from.
///
/// Carried as an explicit tag from the data source, never inferred from
/// field presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Trial,
    Subscription,
}

/// A trial-lesson booking row as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBookingRow {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub booking_date: NaiveDate,
    /// Local wall-clock "HH:MM:SS"
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: BookingStatus,
    pub student_timezone: Option<String>,
    pub tutor_timezone: Option<String>,
    pub notes: Option<String>,
}

/// A subscription-backed booking row as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionBookingRow {
    pub id: String,
    pub subscription_id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub booking_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: BookingStatus,
    pub student_timezone: Option<String>,
    pub tutor_timezone: Option<String>,
    pub notes: Option<String>,
    /// Attached document URLs (lesson material, proofs)
    #[serde(default)]
    pub document_urls: Vec<String>,
}

/// Insert shape for a trial booking (id assigned by the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrialBooking {
    pub student_id: String,
    pub tutor_id: String,
    pub booking_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: BookingStatus,
    pub student_timezone: Option<String>,
    pub tutor_timezone: Option<String>,
    pub notes: Option<String>,
}

/// Insert shape for a subscription-backed booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscriptionBooking {
    pub subscription_id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub booking_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: BookingStatus,
    pub student_timezone: Option<String>,
    pub tutor_timezone: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub document_urls: Vec<String>,
}

/// The normalized booking shape consumed by every screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedBooking {
    pub id: String,
    pub kind: BookingKind,
    pub student_id: String,
    pub tutor_id: String,
    pub booking_date: NaiveDate,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub status: BookingStatus,
    pub student_timezone: Option<String>,
    pub tutor_timezone: Option<String>,
    pub notes: Option<String>,
    /// Subscription kind only; empty for trials
    #[serde(default)]
    pub document_urls: Vec<String>,
    /// Derived from start/end when both are present, never stored
    pub duration_minutes: Option<u32>,
}
