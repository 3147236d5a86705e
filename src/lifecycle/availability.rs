// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Availability-slot legality checks.
//!
//! Slots are half-open intervals `[start, end)`: a slot ending at 10:00 and
//! one starting at 10:00 on the same day do not collide.

use crate::lifecycle::time::ClockTime;
use crate::models::AvailabilitySlot;

/// Slot validation errors, checked before any overlap comparison.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("Slot start {start} must be before end {end}")]
    InvertedRange { start: ClockTime, end: ClockTime },

    #[error("day_of_week {0} out of range 0..=6")]
    DayOutOfRange(u8),

    #[error("Slot overlaps an existing slot on the same day")]
    Overlaps,
}

impl From<SlotError> for crate::error::AppError {
    fn from(err: SlotError) -> Self {
        crate::error::AppError::BadRequest(err.to_string())
    }
}

/// A candidate window, independent of whether it is stored yet.
#[derive(Debug, Clone, Copy)]
pub struct SlotCandidate {
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl From<&AvailabilitySlot> for SlotCandidate {
    fn from(slot: &AvailabilitySlot) -> Self {
        Self {
            day_of_week: slot.day_of_week,
            start_time: slot.start_time,
            end_time: slot.end_time,
        }
    }
}

/// Validate a candidate's own shape. Inverted ranges are a distinct error
/// raised before any overlap check.
pub fn validate_slot(candidate: &SlotCandidate) -> Result<(), SlotError> {
    if candidate.day_of_week > 6 {
        return Err(SlotError::DayOutOfRange(candidate.day_of_week));
    }
    if candidate.start_time >= candidate.end_time {
        return Err(SlotError::InvertedRange {
            start: candidate.start_time,
            end: candidate.end_time,
        });
    }
    Ok(())
}

/// Whether `candidate` overlaps any slot in `existing` on the same weekday.
///
/// `exclude_id` skips the slot being edited so a slot never conflicts with
/// itself.
pub fn has_overlap(
    candidate: &SlotCandidate,
    existing: &[AvailabilitySlot],
    exclude_id: Option<&str>,
) -> bool {
    existing
        .iter()
        .filter(|s| s.day_of_week == candidate.day_of_week)
        .filter(|s| exclude_id != Some(s.id.as_str()))
        .any(|s| candidate.start_time < s.end_time && s.start_time < candidate.end_time)
}

/// Combined check used by the slot create/update paths.
pub fn check_slot(
    candidate: &SlotCandidate,
    existing: &[AvailabilitySlot],
    exclude_id: Option<&str>,
) -> Result<(), SlotError> {
    validate_slot(candidate)?;
    if has_overlap(candidate, existing, exclude_id) {
        return Err(SlotError::Overlaps);
    }
    Ok(())
}
