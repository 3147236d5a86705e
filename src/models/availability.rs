//! Tutor weekly availability slots.

use crate::lifecycle::time::ClockTime;
use serde::{Deserialize, Serialize};

/// A recurring weekly window during which a tutor is bookable.
///
/// Within one tutor's slot set, no two slots on the same `day_of_week` may
/// overlap (half-open interval semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: String,
    pub tutor_id: String,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

/// Insert shape for a new slot (id assigned by the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAvailabilitySlot {
    pub tutor_id: String,
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}
