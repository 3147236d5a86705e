// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provisioning reconciler.
//!
//! Guarantees exactly one profile row per signed-in identity: the first time
//! an identity is observed signed in, a profile is created for it, at most
//! once, no matter how many triggers race. The existence-check-then-create
//! sequence is not globally atomic; a concurrent caller (second device,
//! second instance) may create first, so a create conflict is absorbed by
//! re-fetching the winning row. A per-identity in-process lock suppresses
//! duplicate create traffic within one instance, but correctness rests on
//! the store's uniqueness constraint, never on the lock.

use crate::error::AppError;
use crate::models::{Identity, Profile, ProfileUpdate};
use crate::services::identity::{IdentityClient, SessionResult, SessionStatus};
use crate::store::RowStore;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-identity provisioning locks.
pub type ProvisionLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Reconciler between the identity provider and the profile store.
///
/// Holds the session-lifetime caches: the provisioned profile per identity
/// and the provider access token per identity. The cached profile is exposed
/// read-only; every mutation funnels through the store and then replaces the
/// cache entry.
#[derive(Clone)]
pub struct ProvisioningService {
    identity: IdentityClient,
    store: RowStore,
    /// identity id -> cached profile for the session's lifetime
    profiles: Arc<DashMap<String, Profile>>,
    /// identity id -> provider access token (for sign-out)
    provider_tokens: Arc<DashMap<String, String>>,
    provision_locks: ProvisionLocks,
}

/// Result of a completed sign-in (password or federated).
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub identity: Identity,
    /// `None` when provisioning failed non-fatally; retry via refresh
    pub profile: Option<Profile>,
    pub provider_token: String,
}

/// Result of account creation.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub identity: Identity,
    pub profile: Option<Profile>,
    pub provider_token: Option<String>,
    /// Provisioning is deferred until the identity is observed signed in
    pub needs_email_confirmation: bool,
}

/// Read-only session snapshot for consumers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub is_loaded: bool,
    pub is_signed_in: bool,
}

impl ProvisioningService {
    pub fn new(identity: IdentityClient, store: RowStore) -> Self {
        Self {
            identity,
            store,
            profiles: Arc::new(DashMap::new()),
            provider_tokens: Arc::new(DashMap::new()),
            provision_locks: Arc::new(DashMap::new()),
        }
    }

    // ─── Provisioning Core ───────────────────────────────────────

    /// Make sure a profile row exists for this identity and return it.
    ///
    /// Never fails the session over a create error: anything other than the
    /// absorbed conflict degrades to `Ok(None)` with a warning, and the
    /// caller may retry via [`ProvisioningService::refresh_profile`].
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<Option<Profile>, AppError> {
        // Serialize provisioning attempts for the same identity within this
        // instance. Cross-instance races fall through to conflict handling.
        let lock = self
            .provision_locks
            .entry(identity.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Existence check first: an identity with a profile never triggers
        // a create call.
        if let Some(profile) = self.store.get_profile(&identity.id).await? {
            self.profiles.insert(identity.id.clone(), profile.clone());
            return Ok(Some(profile));
        }

        let (first_name, last_name) = identity.derived_names();
        let now = chrono::Utc::now().to_rfc3339();
        let fresh = Profile::provisioned(&identity.id, &first_name, &last_name, &now);

        match self.store.create_profile(&fresh).await {
            Ok(profile) => {
                tracing::info!(user_id = %identity.id, "Profile provisioned");
                self.profiles.insert(identity.id.clone(), profile.clone());
                Ok(Some(profile))
            }
            Err(err) if err.is_conflict() => {
                // A concurrent caller won the create; theirs is the row.
                tracing::info!(
                    user_id = %identity.id,
                    "Profile create conflict, fetching the winning row"
                );
                let profile = self.store.get_profile(&identity.id).await?;
                if let Some(p) = &profile {
                    self.profiles.insert(identity.id.clone(), p.clone());
                }
                Ok(profile)
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %identity.id,
                    error = %err,
                    "Profile provisioning failed, continuing without profile"
                );
                Ok(None)
            }
        }
    }

    /// Re-run the existence+load path for an identity (never create).
    ///
    /// Used after external profile edits and as the retry path when
    /// provisioning degraded to no profile.
    pub async fn refresh_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        match self.store.get_profile(user_id).await? {
            Some(profile) => {
                self.profiles.insert(user_id.to_string(), profile.clone());
                Ok(Some(profile))
            }
            None => {
                self.profiles.remove(user_id);
                Ok(None)
            }
        }
    }

    /// The cached profile, if this identity provisioned one this session.
    pub fn cached_profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.get(user_id).map(|p| p.clone())
    }

    /// Funnel a profile edit through the store, then replace the cache entry.
    pub async fn update_profile(
        &self,
        user_id: &str,
        mut update: ProfileUpdate,
    ) -> Result<Profile, AppError> {
        update.updated_at = Some(chrono::Utc::now().to_rfc3339());
        let profile = self.store.update_profile(user_id, &update).await?;
        self.profiles.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Email/password sign-in; entering the signed-in state provisions.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, AppError> {
        let session = self.identity.create_session(email, password).await?;
        self.complete_session(session).await
    }

    /// Account creation. On immediate success the profile is created
    /// synchronously before returning, so the caller can navigate assuming
    /// one exists. When the provider defers to email confirmation,
    /// provisioning waits for the first signed-in observation.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<SignUpOutcome, AppError> {
        let session = self
            .identity
            .create_account(email, password, first_name, last_name)
            .await?;

        if session.status == SessionStatus::NeedsEmailConfirmation {
            return Ok(SignUpOutcome {
                identity: session.identity,
                profile: None,
                provider_token: None,
                needs_email_confirmation: true,
            });
        }

        let outcome = self.complete_session(session).await?;
        Ok(SignUpOutcome {
            identity: outcome.identity,
            profile: outcome.profile,
            provider_token: Some(outcome.provider_token),
            needs_email_confirmation: false,
        })
    }

    /// Authorize URL that starts the Google federated flow.
    pub fn federated_authorize_url(&self, redirect_to: &str) -> String {
        self.identity.federated_authorize_url("google", redirect_to)
    }

    /// Finish a federated flow from the provider's callback code.
    pub async fn complete_federated(&self, code: &str) -> Result<SignInOutcome, AppError> {
        let session = self.identity.exchange_federated_code(code).await?;
        self.complete_session(session).await
    }

    /// Sign out: end the provider session and drop the session caches.
    /// The profile row is never deleted here.
    pub async fn sign_out(&self, user_id: &str) -> Result<(), AppError> {
        if let Some((_, token)) = self.provider_tokens.remove(user_id) {
            if let Err(err) = self.identity.end_session(&token).await {
                tracing::warn!(user_id = %user_id, error = %err, "Provider sign-out failed");
            }
        }
        self.profiles.remove(user_id);
        Ok(())
    }

    /// Snapshot of the session behind a provider access token.
    ///
    /// Observing a signed-in identity runs provisioning, which is what picks
    /// up deferred signups after email confirmation.
    pub async fn current(&self, access_token: &str) -> Result<SessionSnapshot, AppError> {
        let identity = self.identity.get_current_identity(access_token).await?;

        match identity {
            Some(identity) => {
                let profile = self.ensure_profile(&identity).await?;
                Ok(SessionSnapshot {
                    identity: Some(identity),
                    profile,
                    is_loaded: true,
                    is_signed_in: true,
                })
            }
            None => Ok(SessionSnapshot {
                identity: None,
                profile: None,
                is_loaded: true,
                is_signed_in: false,
            }),
        }
    }

    /// Shared completion path: cache the provider token and provision.
    async fn complete_session(&self, session: SessionResult) -> Result<SignInOutcome, AppError> {
        let token = session.access_token.ok_or_else(|| {
            AppError::IdentityProvider("Provider returned a session without a token".to_string())
        })?;

        self.provider_tokens
            .insert(session.identity.id.clone(), token.clone());

        let profile = self.ensure_profile(&session.identity).await?;

        Ok(SignInOutcome {
            identity: session.identity,
            profile,
            provider_token: token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileType;

    fn service() -> ProvisioningService {
        ProvisioningService::new(IdentityClient::new_memory(false), RowStore::new_memory())
    }

    fn identity(id: &str, first: Option<&str>, last: Option<&str>) -> Identity {
        Identity {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            external_accounts: vec![],
        }
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_once() {
        let svc = service();
        let id = identity("user_1", Some("Ada"), Some("Lovelace"));

        let first = svc.ensure_profile(&id).await.unwrap().unwrap();
        let second = svc.ensure_profile(&id).await.unwrap().unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(first.profile_type, ProfileType::Student);
    }

    #[tokio::test]
    async fn test_ensure_profile_conflict_absorbed_across_instances() {
        // Two service instances sharing one store: instance-local locks
        // cannot serialize them, so the second create hits the store's
        // uniqueness conflict and must converge on the winning row.
        let store = RowStore::new_memory();
        let a = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());
        let b = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());
        let id = identity("user_1", Some("Ada"), None);

        let (ra, rb) = tokio::join!(a.ensure_profile(&id), b.ensure_profile(&id));
        let pa = ra.unwrap().unwrap();
        let pb = rb.unwrap().unwrap();

        assert_eq!(pa.user_id, pb.user_id);
        assert_eq!(pa.created_at, pb.created_at);
    }

    #[tokio::test]
    async fn test_sign_up_provisions_synchronously() {
        let svc = service();

        let outcome = svc
            .sign_up("ada@example.com", "hunter22", Some("Ada"), Some("Lovelace"))
            .await
            .unwrap();

        assert!(!outcome.needs_email_confirmation);
        let profile = outcome.profile.expect("profile created before returning");
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.user_id, outcome.identity.id);
    }

    #[tokio::test]
    async fn test_sign_up_defers_provisioning_until_confirmed() {
        let identity_client = IdentityClient::new_memory(true);
        let store = RowStore::new_memory();
        let svc = ProvisioningService::new(identity_client.clone(), store.clone());

        let outcome = svc
            .sign_up("ada@example.com", "hunter22", Some("Ada"), None)
            .await
            .unwrap();
        assert!(outcome.needs_email_confirmation);
        assert!(outcome.profile.is_none());
        assert!(!store.profile_exists(&outcome.identity.id).await.unwrap());

        // Confirmation, then the next signed-in observation provisions
        identity_client.confirm_email("ada@example.com");
        let signin = svc.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert!(signin.profile.is_some());
        assert!(store.profile_exists(&outcome.identity.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_clears_cache_but_keeps_row() {
        let svc = service();
        let outcome = svc
            .sign_up("ada@example.com", "hunter22", Some("Ada"), None)
            .await
            .unwrap();
        let user_id = outcome.identity.id;

        assert!(svc.cached_profile(&user_id).is_some());
        svc.sign_out(&user_id).await.unwrap();

        assert!(svc.cached_profile(&user_id).is_none());
        // The row survives sign-out
        let again = svc.refresh_profile(&user_id).await.unwrap();
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn test_refresh_profile_never_creates() {
        let svc = service();
        let refreshed = svc.refresh_profile("ghost_user").await.unwrap();
        assert!(refreshed.is_none());
    }

    #[tokio::test]
    async fn test_current_snapshot_signed_out() {
        let svc = service();
        let snapshot = svc.current("stale_token").await.unwrap();
        assert!(snapshot.is_loaded);
        assert!(!snapshot.is_signed_in);
        assert!(snapshot.identity.is_none() && snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn test_federated_sign_in_provisions_from_external_account() {
        let identity_client = IdentityClient::new_memory(false);
        let mut federated = identity("user_g", None, None);
        federated.external_accounts.push(crate::models::ExternalAccount {
            provider: "google".to_string(),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
        });
        identity_client.seed_federated_code("code_123", federated);

        let svc = ProvisioningService::new(identity_client, RowStore::new_memory());
        let outcome = svc.complete_federated("code_123").await.unwrap();

        let profile = outcome.profile.unwrap();
        assert_eq!(profile.first_name, "Grace");
        assert_eq!(profile.last_name, "Hopper");
    }
}
