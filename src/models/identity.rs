//! Identity shapes owned by the external identity provider.
//!
//! These are read-only to this service; the provider is the source of truth.

use serde::{Deserialize, Serialize};

/// An authenticated principal as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user id (also the Profile foreign key)
    pub id: String,
    /// Email address (may be absent for some federated accounts)
    pub email: Option<String>,
    /// First name, when the provider has one
    pub first_name: Option<String>,
    /// Last name, when the provider has one
    pub last_name: Option<String>,
    /// Linked external accounts (Google etc.)
    #[serde(default)]
    pub external_accounts: Vec<ExternalAccount>,
}

/// A federated account linked to an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAccount {
    /// Provider tag, e.g. "google"
    pub provider: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Identity {
    /// Derive the display name pair used when provisioning a profile.
    ///
    /// Prefers the identity's own fields; when both are absent, falls back to
    /// the first linked external account's fields.
    pub fn derived_names(&self) -> (String, String) {
        if self.first_name.is_some() || self.last_name.is_some() {
            return (
                self.first_name.clone().unwrap_or_default(),
                self.last_name.clone().unwrap_or_default(),
            );
        }

        if let Some(account) = self.external_accounts.first() {
            return (
                account.first_name.clone().unwrap_or_default(),
                account.last_name.clone().unwrap_or_default(),
            );
        }

        (String::new(), String::new())
    }
}
