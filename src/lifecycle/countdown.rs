// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Human-readable countdown to a booking's start.
//!
//! Callers re-invoke once per minute while a countdown is displayed; no
//! sub-minute precision is promised.

use crate::models::{BookingStatus, UnifiedBooking};
use chrono::{DateTime, Utc};

/// Countdown string for a booking, given an explicit "now".
///
/// Empty for cancelled/completed bookings and for bookings without a start
/// time. "started" once the start has passed. Otherwise one of three
/// mutually exclusive buckets; a booking exactly 24h away lands in the days
/// bucket.
pub fn countdown(booking: &UnifiedBooking, now: DateTime<Utc>) -> String {
    match booking.status {
        BookingStatus::Pending | BookingStatus::Confirmed => {}
        BookingStatus::Cancelled | BookingStatus::Completed => return String::new(),
    }

    let start = match booking.start_time {
        Some(t) => booking.booking_date.and_time(t.to_naive()).and_utc(),
        None => return String::new(),
    };

    let delta = start - now;
    if delta <= chrono::Duration::zero() {
        return "started".to_string();
    }

    let total_minutes = delta.num_minutes();
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("in {}, {}", plural(days, "day"), plural(hours, "hour"))
    } else if hours > 0 {
        format!("in {}, {}", plural(hours, "hour"), plural(minutes, "minute"))
    } else {
        format!("in {}", plural(minutes, "minute"))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
