// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.
//!
//! Screens hold collections fetched here; every temporal figure (countdown,
//! progress, expiry phase) is computed by the lifecycle engine against a
//! "now" taken once per request.

use crate::error::{AppError, Result};
use crate::lifecycle;
use crate::lifecycle::{SlotCandidate, SubscriptionPhase};
use crate::middleware::auth::AuthUser;
use crate::models::{
    AvailabilitySlot, BookingKind, BookingStatus, NewAvailabilitySlot, NewSubscriptionBooking,
    NewTrialBooking, Profile, ProfileUpdate, StudentSubscription, UnifiedBooking,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/bookings", get(get_bookings).post(create_booking))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
        .route("/api/subscriptions", get(get_subscriptions))
        .route("/api/availability", get(get_availability).post(create_slot))
        .route("/api/availability/{id}", put(update_slot).delete(delete_slot))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get current user profile.
///
/// Falls back to the store when the session cache is cold (fresh instance),
/// via the load-only refresh path.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Profile>> {
    if let Some(profile) = state.provisioning.cached_profile(&user.user_id) {
        return Ok(Json(profile));
    }

    state
        .provisioning
        .refresh_profile(&user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", user.user_id)))
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub profile_type: Option<crate::models::ProfileType>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    #[validate(length(max = 2000))]
    pub biography: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    #[validate(length(max = 32))]
    pub timezone: Option<String>,
    #[validate(range(max = 168))]
    pub minimum_notice_hours: Option<u32>,
}

/// Update the current user's profile. Mutations funnel through the store;
/// the session cache is replaced, never edited in place.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let update = ProfileUpdate {
        first_name: req.first_name,
        last_name: req.last_name,
        profile_type: req.profile_type,
        avatar_url: req.avatar_url,
        biography: req.biography,
        country: req.country,
        currency: req.currency,
        timezone: req.timezone,
        minimum_notice_hours: req.minimum_notice_hours,
        updated_at: None, // set by the service
    };

    let profile = state.provisioning.update_profile(&user.user_id, update).await?;
    Ok(Json(profile))
}

// ─── Bookings ────────────────────────────────────────────────

/// A unified booking plus its display countdown.
#[derive(Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: UnifiedBooking,
    /// Empty for cancelled/completed bookings
    pub countdown: String,
}

/// All bookings involving the current user, both kinds unified.
async fn get_bookings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<BookingView>>> {
    let (trials, subs) = tokio::try_join!(
        state.store.trial_bookings_for_user(&user.user_id),
        state.store.subscription_bookings_for_user(&user.user_id),
    )?;

    let now = chrono::Utc::now();
    let mut views = Vec::with_capacity(trials.len() + subs.len());

    for row in &trials {
        let booking = lifecycle::unify_trial(row)?;
        views.push(view_of(booking, now));
    }
    for row in &subs {
        let booking = lifecycle::unify_subscription(row)?;
        views.push(view_of(booking, now));
    }

    views.sort_by(|a, b| {
        (a.booking.booking_date, a.booking.start_time)
            .cmp(&(b.booking.booking_date, b.booking.start_time))
    });

    Ok(Json(views))
}

fn view_of(booking: UnifiedBooking, now: chrono::DateTime<chrono::Utc>) -> BookingView {
    let countdown = lifecycle::countdown(&booking, now);
    BookingView { booking, countdown }
}

#[derive(Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub kind: BookingKind,
    #[validate(length(min = 1))]
    pub tutor_id: String,
    /// Required for subscription-backed bookings
    pub subscription_id: Option<String>,
    pub booking_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[validate(length(max = 32))]
    pub student_timezone: Option<String>,
    #[validate(length(max = 32))]
    pub tutor_timezone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Create a booking in `pending` status.
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingView>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Reject malformed or inverted windows before anything is stored
    let start: lifecycle::ClockTime = req.start_time.parse().map_err(AppError::from)?;
    let end: lifecycle::ClockTime = req.end_time.parse().map_err(AppError::from)?;
    lifecycle::minutes_between(start, end)?;

    let now = chrono::Utc::now();
    let booking = match req.kind {
        BookingKind::Trial => {
            let row = state
                .store
                .insert_trial_booking(&NewTrialBooking {
                    student_id: user.user_id.clone(),
                    tutor_id: req.tutor_id,
                    booking_date: req.booking_date,
                    start_time: Some(start.to_string()),
                    end_time: Some(end.to_string()),
                    status: BookingStatus::Pending,
                    student_timezone: req.student_timezone,
                    tutor_timezone: req.tutor_timezone,
                    notes: req.notes,
                })
                .await?;
            lifecycle::unify_trial(&row)?
        }
        BookingKind::Subscription => {
            let subscription_id = req.subscription_id.ok_or_else(|| {
                AppError::BadRequest(
                    "subscription_id is required for subscription bookings".to_string(),
                )
            })?;
            let row = state
                .store
                .insert_subscription_booking(&NewSubscriptionBooking {
                    subscription_id,
                    student_id: user.user_id.clone(),
                    tutor_id: req.tutor_id,
                    booking_date: req.booking_date,
                    start_time: Some(start.to_string()),
                    end_time: Some(end.to_string()),
                    status: BookingStatus::Pending,
                    student_timezone: req.student_timezone,
                    tutor_timezone: req.tutor_timezone,
                    notes: req.notes,
                    document_urls: Vec::new(),
                })
                .await?;
            lifecycle::unify_subscription(&row)?
        }
    };

    tracing::info!(
        user_id = %user.user_id,
        booking_id = %booking.id,
        kind = ?booking.kind,
        "Booking created"
    );

    Ok(Json(view_of(booking, now)))
}

#[derive(Deserialize)]
pub struct CancelBookingRequest {
    pub kind: BookingKind,
}

#[derive(Serialize)]
pub struct CancelBookingResponse {
    pub success: bool,
}

/// Cancel a booking: a soft status transition, never a delete.
/// Only a booking the caller is party to can be cancelled.
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<CancelBookingResponse>> {
    match req.kind {
        BookingKind::Trial => {
            let owned = state
                .store
                .trial_bookings_for_user(&user.user_id)
                .await?
                .iter()
                .any(|b| b.id == id);
            if !owned {
                return Err(AppError::NotFound(format!("Booking {}", id)));
            }
            state
                .store
                .set_trial_booking_status(&id, BookingStatus::Cancelled)
                .await?
        }
        BookingKind::Subscription => {
            let owned = state
                .store
                .subscription_bookings_for_user(&user.user_id)
                .await?
                .iter()
                .any(|b| b.id == id);
            if !owned {
                return Err(AppError::NotFound(format!("Booking {}", id)));
            }
            state
                .store
                .set_subscription_booking_status(&id, BookingStatus::Cancelled)
                .await?
        }
    }

    tracing::info!(user_id = %user.user_id, booking_id = %id, "Booking cancelled");
    Ok(Json(CancelBookingResponse { success: true }))
}

// ─── Subscriptions ───────────────────────────────────────────

/// A subscription plus its derived usage and expiry figures.
#[derive(Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: StudentSubscription,
    /// Sessions used, percent in [0, 100]
    pub progress: f64,
    pub phase: SubscriptionPhase,
}

/// Subscriptions for the current user with derived progress/expiry.
async fn get_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SubscriptionView>>> {
    let subs = state.store.subscriptions_for_student(&user.user_id).await?;

    let now = chrono::Utc::now();
    let views = subs
        .into_iter()
        .map(|subscription| SubscriptionView {
            progress: lifecycle::progress(&subscription),
            phase: lifecycle::classify(&subscription, now),
            subscription,
        })
        .collect();

    Ok(Json(views))
}

// ─── Availability ────────────────────────────────────────────

/// The current user's availability slots (tutors only, in practice).
async fn get_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<AvailabilitySlot>>> {
    let slots = state.store.availability_for_tutor(&user.user_id).await?;
    Ok(Json(slots))
}

#[derive(Deserialize)]
pub struct SlotRequest {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

impl SlotRequest {
    fn candidate(&self) -> Result<SlotCandidate> {
        Ok(SlotCandidate {
            day_of_week: self.day_of_week,
            start_time: self.start_time.parse().map_err(AppError::from)?,
            end_time: self.end_time.parse().map_err(AppError::from)?,
        })
    }
}

/// Add an availability slot after checking legality against existing slots.
async fn create_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<AvailabilitySlot>> {
    let candidate = req.candidate()?;
    let existing = state.store.availability_for_tutor(&user.user_id).await?;
    lifecycle::check_slot(&candidate, &existing, None)?;

    let slot = state
        .store
        .insert_availability_slot(&NewAvailabilitySlot {
            tutor_id: user.user_id.clone(),
            day_of_week: candidate.day_of_week,
            start_time: candidate.start_time,
            end_time: candidate.end_time,
        })
        .await?;

    tracing::info!(user_id = %user.user_id, slot_id = %slot.id, "Availability slot added");
    Ok(Json(slot))
}

/// Move or resize a slot; the slot never conflicts with itself.
async fn update_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<AvailabilitySlot>> {
    let candidate = req.candidate()?;
    let existing = state.store.availability_for_tutor(&user.user_id).await?;
    lifecycle::check_slot(&candidate, &existing, Some(&id))?;

    let slot = state
        .store
        .update_availability_slot(
            &id,
            &user.user_id,
            &NewAvailabilitySlot {
                tutor_id: user.user_id.clone(),
                day_of_week: candidate.day_of_week,
                start_time: candidate.start_time,
                end_time: candidate.end_time,
            },
        )
        .await?;

    Ok(Json(slot))
}

#[derive(Serialize)]
pub struct DeleteSlotResponse {
    pub success: bool,
}

/// Remove a slot.
async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSlotResponse>> {
    state
        .store
        .delete_availability_slot(&id, &user.user_id)
        .await?;
    Ok(Json(DeleteSlotResponse { success: true }))
}
