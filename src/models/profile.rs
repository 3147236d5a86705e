//! Profile model for storage and API.

use serde::{Deserialize, Serialize};

/// Whether a profile belongs to a student or a tutor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Student,
    Tutor,
}

/// This service's own record of a person, keyed by identity id.
///
/// Created exactly once per identity the first time that identity is observed
/// signed in; never deleted by this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Identity provider user id (unique)
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_type: ProfileType,
    /// Avatar URL, if an avatar has been uploaded
    pub avatar_url: Option<String>,
    pub biography: Option<String>,
    pub country: Option<String>,
    /// Preferred display currency code, e.g. "USD"
    pub currency: Option<String>,
    /// UTC-offset label, e.g. "UTC+02:00" (opaque display string)
    pub timezone: Option<String>,
    /// Minimum notice a tutor requires before a booking starts (hours)
    pub minimum_notice_hours: Option<u32>,
    /// When the profile was created (ISO 8601)
    pub created_at: String,
    /// Last profile edit (ISO 8601)
    pub updated_at: String,
}

/// Patch shape for profile edits; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<ProfileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_notice_hours: Option<u32>,
    /// Set by the service on every update (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Profile {
    /// Apply a patch in place, the way the row store's PATCH would.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(v) = &update.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &update.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = update.profile_type {
            self.profile_type = v;
        }
        if let Some(v) = &update.avatar_url {
            self.avatar_url = Some(v.clone());
        }
        if let Some(v) = &update.biography {
            self.biography = Some(v.clone());
        }
        if let Some(v) = &update.country {
            self.country = Some(v.clone());
        }
        if let Some(v) = &update.currency {
            self.currency = Some(v.clone());
        }
        if let Some(v) = &update.timezone {
            self.timezone = Some(v.clone());
        }
        if let Some(v) = update.minimum_notice_hours {
            self.minimum_notice_hours = Some(v);
        }
        if let Some(v) = &update.updated_at {
            self.updated_at = v.clone();
        }
    }

    /// A fresh student profile as created by provisioning.
    pub fn provisioned(user_id: &str, first_name: &str, last_name: &str, now: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            profile_type: ProfileType::Student,
            avatar_url: None,
            biography: None,
            country: None,
            currency: None,
            timezone: None,
            minimum_notice_hours: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}
