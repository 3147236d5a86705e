// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Row store client with typed operations.
//!
//! The backend exposes plain row CRUD over HTTP (PostgREST-style filters,
//! inserts, patches). Provides high-level operations for:
//! - Profiles (provisioned records, keyed by identity id)
//! - Trial and subscription bookings
//! - Student subscriptions
//! - Availability slots
//!
//! An in-memory backend backs tests and local development; its profile
//! insert is atomic and reports a conflict when the row exists, which is the
//! uniqueness constraint the provisioning path leans on.

use crate::error::AppError;
use crate::models::{
    AvailabilitySlot, BookingStatus, NewAvailabilitySlot, NewSubscriptionBooking, NewTrialBooking,
    Profile, ProfileUpdate, StudentSubscription, SubscriptionBookingRow, TrialBookingRow,
};
use crate::store::tables;
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Row store client.
#[derive(Clone)]
pub struct RowStore {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Http(HttpBackend),
    Memory(MemoryBackend),
}

impl RowStore {
    /// Create a client against the HTTP row store.
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            backend: Backend::Http(HttpBackend {
                http: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                service_key: service_key.to_string(),
            }),
        }
    }

    /// Create an in-memory store for tests and local development.
    pub fn new_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryBackend::default()),
        }
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Does a profile exist for this identity?
    pub async fn profile_exists(&self, user_id: &str) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let rows: Vec<serde_json::Value> = http
                    .select(
                        tables::PROFILES,
                        &[
                            ("select", "user_id"),
                            ("user_id", &format!("eq.{}", user_id)),
                            ("limit", "1"),
                        ],
                    )
                    .await?;
                Ok(!rows.is_empty())
            }
            Backend::Memory(mem) => Ok(mem.profiles.contains_key(user_id)),
        }
    }

    /// Get a profile by identity id.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<Profile> = http
                    .select(
                        tables::PROFILES,
                        &[("user_id", &format!("eq.{}", user_id)), ("limit", "1")],
                    )
                    .await?;
                Ok(rows.pop())
            }
            Backend::Memory(mem) => Ok(mem.profiles.get(user_id).map(|p| p.clone())),
        }
    }

    /// Create a profile row.
    ///
    /// Returns `AppError::Conflict` when a row for this identity already
    /// exists; the store's uniqueness constraint on `user_id` is what makes
    /// provisioning idempotent across instances.
    pub async fn create_profile(&self, profile: &Profile) -> Result<Profile, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<Profile> = http.insert(tables::PROFILES, profile).await?;
                rows.pop()
                    .ok_or_else(|| AppError::Store("Insert returned no row".to_string()))
            }
            Backend::Memory(mem) => {
                use dashmap::mapref::entry::Entry;
                match mem.profiles.entry(profile.user_id.clone()) {
                    Entry::Occupied(_) => Err(AppError::Conflict(format!(
                        "Profile for {} already exists",
                        profile.user_id
                    ))),
                    Entry::Vacant(slot) => {
                        slot.insert(profile.clone());
                        Ok(profile.clone())
                    }
                }
            }
        }
    }

    /// Patch a profile's editable fields.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<Profile> = http
                    .patch(
                        tables::PROFILES,
                        &[("user_id", &format!("eq.{}", user_id))],
                        update,
                    )
                    .await?;
                rows.pop()
                    .ok_or_else(|| AppError::NotFound(format!("Profile {}", user_id)))
            }
            Backend::Memory(mem) => {
                let mut profile = mem
                    .profiles
                    .get_mut(user_id)
                    .ok_or_else(|| AppError::NotFound(format!("Profile {}", user_id)))?;
                profile.apply(update);
                Ok(profile.clone())
            }
        }
    }

    // ─── Booking Operations ──────────────────────────────────────

    /// Trial bookings where the user is either side.
    pub async fn trial_bookings_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TrialBookingRow>, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                http.select(
                    tables::TRIAL_BOOKINGS,
                    &[
                        (
                            "or",
                            &format!("(student_id.eq.{},tutor_id.eq.{})", user_id, user_id),
                        ),
                        ("order", "booking_date.asc,start_time.asc"),
                    ],
                )
                .await
            }
            Backend::Memory(mem) => {
                let mut rows: Vec<TrialBookingRow> = mem
                    .trial_bookings
                    .iter()
                    .filter(|r| r.student_id == user_id || r.tutor_id == user_id)
                    .map(|r| r.clone())
                    .collect();
                rows.sort_by(|a, b| {
                    (a.booking_date, &a.start_time).cmp(&(b.booking_date, &b.start_time))
                });
                Ok(rows)
            }
        }
    }

    /// Subscription bookings where the user is either side.
    pub async fn subscription_bookings_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<SubscriptionBookingRow>, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                http.select(
                    tables::SUBSCRIPTION_BOOKINGS,
                    &[
                        (
                            "or",
                            &format!("(student_id.eq.{},tutor_id.eq.{})", user_id, user_id),
                        ),
                        ("order", "booking_date.asc,start_time.asc"),
                    ],
                )
                .await
            }
            Backend::Memory(mem) => {
                let mut rows: Vec<SubscriptionBookingRow> = mem
                    .subscription_bookings
                    .iter()
                    .filter(|r| r.student_id == user_id || r.tutor_id == user_id)
                    .map(|r| r.clone())
                    .collect();
                rows.sort_by(|a, b| {
                    (a.booking_date, &a.start_time).cmp(&(b.booking_date, &b.start_time))
                });
                Ok(rows)
            }
        }
    }

    /// Insert a trial booking; the store assigns the id.
    pub async fn insert_trial_booking(
        &self,
        new: &NewTrialBooking,
    ) -> Result<TrialBookingRow, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<TrialBookingRow> =
                    http.insert(tables::TRIAL_BOOKINGS, new).await?;
                rows.pop()
                    .ok_or_else(|| AppError::Store("Insert returned no row".to_string()))
            }
            Backend::Memory(mem) => {
                let row = TrialBookingRow {
                    id: mem.next_id("tb"),
                    student_id: new.student_id.clone(),
                    tutor_id: new.tutor_id.clone(),
                    booking_date: new.booking_date,
                    start_time: new.start_time.clone(),
                    end_time: new.end_time.clone(),
                    status: new.status,
                    student_timezone: new.student_timezone.clone(),
                    tutor_timezone: new.tutor_timezone.clone(),
                    notes: new.notes.clone(),
                };
                mem.trial_bookings.insert(row.id.clone(), row.clone());
                Ok(row)
            }
        }
    }

    /// Insert a subscription-backed booking; the store assigns the id.
    pub async fn insert_subscription_booking(
        &self,
        new: &NewSubscriptionBooking,
    ) -> Result<SubscriptionBookingRow, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<SubscriptionBookingRow> =
                    http.insert(tables::SUBSCRIPTION_BOOKINGS, new).await?;
                rows.pop()
                    .ok_or_else(|| AppError::Store("Insert returned no row".to_string()))
            }
            Backend::Memory(mem) => {
                let row = SubscriptionBookingRow {
                    id: mem.next_id("sb"),
                    subscription_id: new.subscription_id.clone(),
                    student_id: new.student_id.clone(),
                    tutor_id: new.tutor_id.clone(),
                    booking_date: new.booking_date,
                    start_time: new.start_time.clone(),
                    end_time: new.end_time.clone(),
                    status: new.status,
                    student_timezone: new.student_timezone.clone(),
                    tutor_timezone: new.tutor_timezone.clone(),
                    notes: new.notes.clone(),
                    document_urls: new.document_urls.clone(),
                };
                mem.subscription_bookings.insert(row.id.clone(), row.clone());
                Ok(row)
            }
        }
    }

    /// Soft status transition on a trial booking. Bookings are never deleted.
    pub async fn set_trial_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let _: Vec<serde_json::Value> = http
                    .patch(
                        tables::TRIAL_BOOKINGS,
                        &[("id", &format!("eq.{}", id))],
                        &serde_json::json!({ "status": status }),
                    )
                    .await?;
                Ok(())
            }
            Backend::Memory(mem) => {
                let mut row = mem
                    .trial_bookings
                    .get_mut(id)
                    .ok_or_else(|| AppError::NotFound(format!("Trial booking {}", id)))?;
                row.status = status;
                Ok(())
            }
        }
    }

    /// Soft status transition on a subscription booking.
    pub async fn set_subscription_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let _: Vec<serde_json::Value> = http
                    .patch(
                        tables::SUBSCRIPTION_BOOKINGS,
                        &[("id", &format!("eq.{}", id))],
                        &serde_json::json!({ "status": status }),
                    )
                    .await?;
                Ok(())
            }
            Backend::Memory(mem) => {
                let mut row = mem
                    .subscription_bookings
                    .get_mut(id)
                    .ok_or_else(|| AppError::NotFound(format!("Subscription booking {}", id)))?;
                row.status = status;
                Ok(())
            }
        }
    }

    // ─── Subscription Operations ─────────────────────────────────

    /// Subscriptions purchased by a student.
    pub async fn subscriptions_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<StudentSubscription>, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                http.select(
                    tables::SUBSCRIPTIONS,
                    &[
                        ("student_id", &format!("eq.{}", student_id)),
                        ("order", "end_date.asc"),
                    ],
                )
                .await
            }
            Backend::Memory(mem) => {
                let mut rows: Vec<StudentSubscription> = mem
                    .subscriptions
                    .iter()
                    .filter(|s| s.student_id == student_id)
                    .map(|s| s.clone())
                    .collect();
                rows.sort_by_key(|s| s.end_date);
                Ok(rows)
            }
        }
    }

    /// Seed or store a subscription row (memory backend and admin tooling).
    pub async fn insert_subscription(
        &self,
        sub: &StudentSubscription,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let _: Vec<StudentSubscription> = http.insert(tables::SUBSCRIPTIONS, sub).await?;
                Ok(())
            }
            Backend::Memory(mem) => {
                mem.subscriptions.insert(sub.id.clone(), sub.clone());
                Ok(())
            }
        }
    }

    // ─── Availability Operations ─────────────────────────────────

    /// All slots owned by a tutor.
    pub async fn availability_for_tutor(
        &self,
        tutor_id: &str,
    ) -> Result<Vec<AvailabilitySlot>, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                http.select(
                    tables::AVAILABILITY_SLOTS,
                    &[
                        ("tutor_id", &format!("eq.{}", tutor_id)),
                        ("order", "day_of_week.asc,start_time.asc"),
                    ],
                )
                .await
            }
            Backend::Memory(mem) => {
                let mut rows: Vec<AvailabilitySlot> = mem
                    .availability_slots
                    .iter()
                    .filter(|s| s.tutor_id == tutor_id)
                    .map(|s| s.clone())
                    .collect();
                rows.sort_by_key(|s| (s.day_of_week, s.start_time));
                Ok(rows)
            }
        }
    }

    /// Insert a slot; legality against the tutor's existing slots is the
    /// caller's responsibility (lifecycle engine).
    pub async fn insert_availability_slot(
        &self,
        new: &NewAvailabilitySlot,
    ) -> Result<AvailabilitySlot, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<AvailabilitySlot> =
                    http.insert(tables::AVAILABILITY_SLOTS, new).await?;
                rows.pop()
                    .ok_or_else(|| AppError::Store("Insert returned no row".to_string()))
            }
            Backend::Memory(mem) => {
                let slot = AvailabilitySlot {
                    id: mem.next_id("slot"),
                    tutor_id: new.tutor_id.clone(),
                    day_of_week: new.day_of_week,
                    start_time: new.start_time,
                    end_time: new.end_time,
                };
                mem.availability_slots.insert(slot.id.clone(), slot.clone());
                Ok(slot)
            }
        }
    }

    /// Replace a slot's window. Scoped to the owning tutor.
    pub async fn update_availability_slot(
        &self,
        id: &str,
        tutor_id: &str,
        new: &NewAvailabilitySlot,
    ) -> Result<AvailabilitySlot, AppError> {
        match &self.backend {
            Backend::Http(http) => {
                let mut rows: Vec<AvailabilitySlot> = http
                    .patch(
                        tables::AVAILABILITY_SLOTS,
                        &[
                            ("id", &format!("eq.{}", id)),
                            ("tutor_id", &format!("eq.{}", tutor_id)),
                        ],
                        new,
                    )
                    .await?;
                rows.pop()
                    .ok_or_else(|| AppError::NotFound(format!("Availability slot {}", id)))
            }
            Backend::Memory(mem) => {
                let mut slot = mem
                    .availability_slots
                    .get_mut(id)
                    .filter(|s| s.tutor_id == tutor_id)
                    .ok_or_else(|| AppError::NotFound(format!("Availability slot {}", id)))?;
                slot.day_of_week = new.day_of_week;
                slot.start_time = new.start_time;
                slot.end_time = new.end_time;
                Ok(slot.clone())
            }
        }
    }

    /// Delete a slot. Scoped to the owning tutor.
    pub async fn delete_availability_slot(
        &self,
        id: &str,
        tutor_id: &str,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Http(http) => {
                http.delete(
                    tables::AVAILABILITY_SLOTS,
                    &[
                        ("id", &format!("eq.{}", id)),
                        ("tutor_id", &format!("eq.{}", tutor_id)),
                    ],
                )
                .await
            }
            Backend::Memory(mem) => {
                let owned = mem
                    .availability_slots
                    .get(id)
                    .map(|s| s.tutor_id == tutor_id)
                    .unwrap_or(false);
                if !owned {
                    return Err(AppError::NotFound(format!("Availability slot {}", id)));
                }
                mem.availability_slots.remove(id);
                Ok(())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpBackend {
    fn url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .http
            .get(self.url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        Self::check_response_json(response).await
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .http
            .post(self.url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        Self::check_response_json(response).await
    }

    async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .http
            .patch(self.url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        Self::check_response_json(response).await
    }

    async fn delete(&self, table: &str, query: &[(&str, &str)]) -> Result<(), AppError> {
        let response = self
            .http
            .delete(self.url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Store(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    ///
    /// A 409 is surfaced as `AppError::Conflict` so the provisioning path can
    /// absorb duplicate creates.
    async fn check_response_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status == StatusCode::CONFLICT {
                return Err(AppError::Conflict(body));
            }

            return Err(AppError::Store(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("JSON parse error: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct MemoryBackend {
    profiles: Arc<DashMap<String, Profile>>,
    trial_bookings: Arc<DashMap<String, TrialBookingRow>>,
    subscription_bookings: Arc<DashMap<String, SubscriptionBookingRow>>,
    subscriptions: Arc<DashMap<String, StudentSubscription>>,
    availability_slots: Arc<DashMap<String, AvailabilitySlot>>,
    id_counter: Arc<AtomicU64>,
}

impl MemoryBackend {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.id_counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_profile_create_then_get() {
        let store = RowStore::new_memory();
        let profile = Profile::provisioned("user_1", "Ada", "Lovelace", "2026-08-29T00:00:00Z");

        store.create_profile(&profile).await.unwrap();

        assert!(store.profile_exists("user_1").await.unwrap());
        let loaded = store.get_profile("user_1").await.unwrap().unwrap();
        assert_eq!(loaded.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_memory_duplicate_create_conflicts() {
        let store = RowStore::new_memory();
        let profile = Profile::provisioned("user_1", "Ada", "Lovelace", "2026-08-29T00:00:00Z");

        store.create_profile(&profile).await.unwrap();
        let err = store.create_profile(&profile).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_memory_update_profile() {
        let store = RowStore::new_memory();
        let profile = Profile::provisioned("user_1", "Ada", "Lovelace", "2026-08-29T00:00:00Z");
        store.create_profile(&profile).await.unwrap();

        let update = ProfileUpdate {
            biography: Some("Mathematician".to_string()),
            updated_at: Some("2026-08-30T00:00:00Z".to_string()),
            ..Default::default()
        };
        let updated = store.update_profile("user_1", &update).await.unwrap();

        assert_eq!(updated.biography.as_deref(), Some("Mathematician"));
        assert_eq!(updated.first_name, "Ada"); // untouched
        assert_eq!(updated.updated_at, "2026-08-30T00:00:00Z");
    }

    #[tokio::test]
    async fn test_memory_slot_delete_scoped_to_owner() {
        let store = RowStore::new_memory();
        let slot = store
            .insert_availability_slot(&NewAvailabilitySlot {
                tutor_id: "tutor_1".to_string(),
                day_of_week: 1,
                start_time: "09:00".parse().unwrap(),
                end_time: "10:00".parse().unwrap(),
            })
            .await
            .unwrap();

        let err = store
            .delete_availability_slot(&slot.id, "someone_else")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        store
            .delete_availability_slot(&slot.id, "tutor_1")
            .await
            .unwrap();
        assert!(store
            .availability_for_tutor("tutor_1")
            .await
            .unwrap()
            .is_empty());
    }
}
