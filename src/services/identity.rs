// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client.
//!
//! Handles:
//! - Email/password session creation and account creation
//! - Federated (Google) authorize URL + code exchange
//! - Current-identity lookup from a provider access token
//! - Session termination
//!
//! The provider owns identities outright; this client never mutates name or
//! account fields. An in-memory backend backs tests, including the
//! "email confirmation required" signup path.

use crate::error::AppError;
use crate::models::{ExternalAccount, Identity};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Whether the provider finished the operation or needs the user to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Complete,
    NeedsEmailConfirmation,
}

/// A provider session, returned by sign-in/up and federated exchange.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub identity: Identity,
    /// Provider access token; absent while confirmation is pending
    pub access_token: Option<String>,
    pub status: SessionStatus,
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityClient {
    backend: IdentityBackend,
}

#[derive(Clone)]
enum IdentityBackend {
    Http(HttpIdentity),
    Memory(MemoryIdentity),
}

impl IdentityClient {
    /// Create a client against the hosted identity provider.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            backend: IdentityBackend::Http(HttpIdentity {
                http: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
            }),
        }
    }

    /// Create an in-memory provider for tests.
    ///
    /// With `require_email_confirmation`, account creation returns no session
    /// until the account is confirmed via [`IdentityClient::confirm_email`].
    pub fn new_memory(require_email_confirmation: bool) -> Self {
        Self {
            backend: IdentityBackend::Memory(MemoryIdentity {
                accounts: Arc::new(DashMap::new()),
                sessions: Arc::new(DashMap::new()),
                federated_codes: Arc::new(DashMap::new()),
                counter: Arc::new(AtomicU64::new(0)),
                require_email_confirmation,
            }),
        }
    }

    /// Create a session from email/password credentials.
    pub async fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionResult, AppError> {
        match &self.backend {
            IdentityBackend::Http(http) => {
                let body = serde_json::json!({ "email": email, "password": password });
                let session: ProviderSession = http
                    .post_json("/auth/v1/token?grant_type=password", &body)
                    .await?;
                Ok(session.into_result())
            }
            IdentityBackend::Memory(mem) => mem.create_session(email, password),
        }
    }

    /// Create an account; may report that email confirmation is still needed.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<SessionResult, AppError> {
        match &self.backend {
            IdentityBackend::Http(http) => {
                let body = serde_json::json!({
                    "email": email,
                    "password": password,
                    "data": { "first_name": first_name, "last_name": last_name },
                });
                let session: ProviderSession = http.post_json("/auth/v1/signup", &body).await?;
                Ok(session.into_result())
            }
            IdentityBackend::Memory(mem) => {
                mem.create_account(email, password, first_name, last_name)
            }
        }
    }

    /// Authorize URL that starts the federated sign-in flow.
    ///
    /// The user completes the flow on the provider; a non-error that requires
    /// further user action is expected here, and provisioning happens only
    /// when the callback observes a signed-in identity.
    pub fn federated_authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        let base = match &self.backend {
            IdentityBackend::Http(http) => http.base_url.clone(),
            IdentityBackend::Memory(_) => "http://identity.test".to_string(),
        };
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}",
            base,
            provider,
            urlencoding::encode(redirect_to)
        )
    }

    /// Exchange the code from a completed federated flow for a session.
    pub async fn exchange_federated_code(&self, code: &str) -> Result<SessionResult, AppError> {
        match &self.backend {
            IdentityBackend::Http(http) => {
                let body = serde_json::json!({ "auth_code": code });
                let session: ProviderSession = http
                    .post_json("/auth/v1/token?grant_type=authorization_code", &body)
                    .await?;
                Ok(session.into_result())
            }
            IdentityBackend::Memory(mem) => mem.exchange_federated_code(code),
        }
    }

    /// Current identity for a provider access token, or `None` when the
    /// session is gone.
    pub async fn get_current_identity(&self, access_token: &str) -> Result<Option<Identity>, AppError> {
        match &self.backend {
            IdentityBackend::Http(http) => {
                match http.get_user(access_token).await {
                    Ok(user) => Ok(Some(user.into_identity())),
                    Err(AppError::Unauthorized) => Ok(None),
                    Err(e) => Err(e),
                }
            }
            IdentityBackend::Memory(mem) => Ok(mem.identity_for_token(access_token)),
        }
    }

    /// End the provider session for an access token.
    pub async fn end_session(&self, access_token: &str) -> Result<(), AppError> {
        match &self.backend {
            IdentityBackend::Http(http) => http.post_empty("/auth/v1/logout", access_token).await,
            IdentityBackend::Memory(mem) => {
                mem.sessions.remove(access_token);
                Ok(())
            }
        }
    }

    // ─── Memory-backend test hooks ───────────────────────────────

    /// Mark a memory-backend account as confirmed (no-op over HTTP).
    pub fn confirm_email(&self, email: &str) {
        if let IdentityBackend::Memory(mem) = &self.backend {
            if let Some(mut account) = mem.accounts.get_mut(email) {
                account.confirmed = true;
            }
        }
    }

    /// Seed a federated exchange code resolving to an identity (memory only).
    pub fn seed_federated_code(&self, code: &str, identity: Identity) {
        if let IdentityBackend::Memory(mem) = &self.backend {
            mem.federated_codes.insert(code.to_string(), identity);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct HttpIdentity {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentity {
    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        Self::check_response_json(response).await
    }

    async fn post_empty(&self, path: &str, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::IdentityProvider(format!("HTTP {}: {}", status, body)))
    }

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, AppError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        if response.status().as_u16() == 401 {
            return Err(AppError::Unauthorized);
        }

        Self::check_response_json(response).await
    }

    /// Check response status and parse JSON.
    ///
    /// Credential-class rejections (4xx) carry the provider's message through
    /// for inline display; everything else is a provider fault.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.message())
                .unwrap_or(body);

            if status.is_client_error() {
                return Err(AppError::BadRequest(message));
            }
            return Err(AppError::IdentityProvider(format!("HTTP {}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("JSON parse error: {}", e)))
    }
}

/// Session payload from the provider's token/signup endpoints.
#[derive(Debug, Clone, Deserialize)]
struct ProviderSession {
    access_token: Option<String>,
    user: ProviderUser,
}

impl ProviderSession {
    fn into_result(self) -> SessionResult {
        let status = if self.access_token.is_some() {
            SessionStatus::Complete
        } else {
            // Signup accepted but no session: confirmation pending
            SessionStatus::NeedsEmailConfirmation
        };
        SessionResult {
            identity: self.user.into_identity(),
            access_token: self.access_token,
            status,
        }
    }
}

/// User payload from the provider.
#[derive(Debug, Clone, Deserialize)]
struct ProviderUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: ProviderUserMetadata,
    #[serde(default)]
    identities: Vec<ProviderLinkedIdentity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProviderUserMetadata {
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderLinkedIdentity {
    provider: String,
    #[serde(default)]
    identity_data: ProviderUserMetadata,
}

impl ProviderUser {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email,
            first_name: self.user_metadata.first_name,
            last_name: self.user_metadata.last_name,
            external_accounts: self
                .identities
                .into_iter()
                .map(|i| ExternalAccount {
                    provider: i.provider,
                    first_name: i.identity_data.first_name,
                    last_name: i.identity_data.last_name,
                })
                .collect(),
        }
    }
}

/// Error body shapes the provider uses.
#[derive(Debug, Deserialize)]
struct ProviderError {
    msg: Option<String>,
    error_description: Option<String>,
}

impl ProviderError {
    fn message(self) -> String {
        self.msg
            .or(self.error_description)
            .unwrap_or_else(|| "Identity provider rejected the request".to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct MemoryIdentity {
    accounts: Arc<DashMap<String, MemoryAccount>>,
    /// access token -> identity
    sessions: Arc<DashMap<String, Identity>>,
    federated_codes: Arc<DashMap<String, Identity>>,
    counter: Arc<AtomicU64>,
    require_email_confirmation: bool,
}

#[derive(Clone)]
struct MemoryAccount {
    identity: Identity,
    password: String,
    confirmed: bool,
}

impl MemoryIdentity {
    fn next(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn open_session(&self, identity: Identity) -> SessionResult {
        let token = self.next("tok");
        self.sessions.insert(token.clone(), identity.clone());
        SessionResult {
            identity,
            access_token: Some(token),
            status: SessionStatus::Complete,
        }
    }

    fn create_account(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<SessionResult, AppError> {
        if self.accounts.contains_key(email) {
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }

        let identity = Identity {
            id: self.next("user"),
            email: Some(email.to_string()),
            first_name: first_name.map(String::from),
            last_name: last_name.map(String::from),
            external_accounts: vec![],
        };
        self.accounts.insert(
            email.to_string(),
            MemoryAccount {
                identity: identity.clone(),
                password: password.to_string(),
                confirmed: !self.require_email_confirmation,
            },
        );

        if self.require_email_confirmation {
            return Ok(SessionResult {
                identity,
                access_token: None,
                status: SessionStatus::NeedsEmailConfirmation,
            });
        }
        Ok(self.open_session(identity))
    }

    fn create_session(&self, email: &str, password: &str) -> Result<SessionResult, AppError> {
        let account = self
            .accounts
            .get(email)
            .ok_or_else(|| AppError::BadRequest("Invalid login credentials".to_string()))?;

        if account.password != password {
            return Err(AppError::BadRequest("Invalid login credentials".to_string()));
        }
        if !account.confirmed {
            return Err(AppError::BadRequest("Email not confirmed".to_string()));
        }

        Ok(self.open_session(account.identity.clone()))
    }

    fn exchange_federated_code(&self, code: &str) -> Result<SessionResult, AppError> {
        let identity = self
            .federated_codes
            .remove(code)
            .map(|(_, identity)| identity)
            .ok_or_else(|| AppError::BadRequest("Invalid authorization code".to_string()))?;
        Ok(self.open_session(identity))
    }

    fn identity_for_token(&self, token: &str) -> Option<Identity> {
        self.sessions.get(token).map(|i| i.clone())
    }
}
