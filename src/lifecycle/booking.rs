// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalization of the two booking kinds into `UnifiedBooking`.

use crate::lifecycle::time::{minutes_between, ClockTime, TimeError};
use crate::models::{SubscriptionBookingRow, TrialBookingRow, UnifiedBooking};

/// Normalize a trial booking row.
pub fn unify_trial(row: &TrialBookingRow) -> Result<UnifiedBooking, TimeError> {
    let (start, end, duration) = parse_window(&row.start_time, &row.end_time)?;

    Ok(UnifiedBooking {
        id: row.id.clone(),
        kind: crate::models::BookingKind::Trial,
        student_id: row.student_id.clone(),
        tutor_id: row.tutor_id.clone(),
        booking_date: row.booking_date,
        start_time: start,
        end_time: end,
        status: row.status,
        student_timezone: row.student_timezone.clone(),
        tutor_timezone: row.tutor_timezone.clone(),
        notes: row.notes.clone(),
        document_urls: Vec::new(),
        duration_minutes: duration,
    })
}

/// Normalize a subscription-backed booking row.
pub fn unify_subscription(row: &SubscriptionBookingRow) -> Result<UnifiedBooking, TimeError> {
    let (start, end, duration) = parse_window(&row.start_time, &row.end_time)?;

    Ok(UnifiedBooking {
        id: row.id.clone(),
        kind: crate::models::BookingKind::Subscription,
        student_id: row.student_id.clone(),
        tutor_id: row.tutor_id.clone(),
        booking_date: row.booking_date,
        start_time: start,
        end_time: end,
        status: row.status,
        student_timezone: row.student_timezone.clone(),
        tutor_timezone: row.tutor_timezone.clone(),
        notes: row.notes.clone(),
        document_urls: row.document_urls.clone(),
        duration_minutes: duration,
    })
}

/// Parse the optional start/end pair; duration is derived only when both are
/// present, and an inverted pair is a typed error.
fn parse_window(
    start: &Option<String>,
    end: &Option<String>,
) -> Result<(Option<ClockTime>, Option<ClockTime>, Option<u32>), TimeError> {
    let start = start.as_deref().map(str::parse).transpose()?;
    let end = end.as_deref().map(str::parse).transpose()?;

    let duration = match (start, end) {
        (Some(s), Some(e)) => Some(minutes_between(s, e)?),
        _ => None,
    };

    Ok((start, end, duration))
}
