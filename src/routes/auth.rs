// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: email/password sessions and the Google
//! federated flow.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser};
use crate::models::Profile;
use crate::AppState;

use hmac::{Hmac, Mac};
use sha2::Sha256;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/session", get(session))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
}

/// Routes that need an authenticated session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/signout", post(sign_out))
}

// ─── Email / Password ────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    /// Session JWT; absent while email confirmation is pending
    pub token: Option<String>,
    pub profile: Option<Profile>,
    pub needs_email_confirmation: bool,
}

/// Create an account. On immediate success the profile exists before this
/// returns; the client may navigate straight into the app.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<SignUpResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .provisioning
        .sign_up(
            &req.email,
            &req.password,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
        )
        .await?;

    if outcome.needs_email_confirmation {
        tracing::info!(user_id = %outcome.identity.id, "Signup pending email confirmation");
        return Ok(Json(SignUpResponse {
            token: None,
            profile: None,
            needs_email_confirmation: true,
        }));
    }

    let token = create_jwt(&outcome.identity.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %outcome.identity.id, "Signup complete");

    Ok(Json(SignUpResponse {
        token: Some(token),
        profile: outcome.profile,
        needs_email_confirmation: false,
    }))
}

#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    /// `None` when provisioning degraded; the client retries via /api/me
    pub profile: Option<Profile>,
}

/// Sign in with email/password. Provider rejections come back as an inline
/// error body, never a panic.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SignInResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state.provisioning.sign_in(&req.email, &req.password).await?;

    let token = create_jwt(&outcome.identity.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %outcome.identity.id, "Sign-in complete");

    Ok(Json(SignInResponse {
        token,
        profile: outcome.profile,
    }))
}

/// Session snapshot behind a provider access token.
///
/// Observing a signed-in identity runs provisioning, so this is also how a
/// deferred signup (email confirmation) gets its profile on first load.
async fn session(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<crate::services::SessionSnapshot>> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let snapshot = state.provisioning.current(token).await?;
    Ok(Json(snapshot))
}

#[derive(Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

/// End the session. The profile row is never deleted.
async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SignOutResponse>> {
    state.provisioning.sign_out(&user.user_id).await?;
    tracing::info!(user_id = %user.user_id, "Signed out");
    Ok(Json(SignOutResponse { success: true }))
}

// ─── Google Federated Flow ───────────────────────────────────

/// Query parameters for starting the federated flow.
#[derive(Deserialize)]
pub struct FederatedStartParams {
    /// Frontend URL to redirect back to after the flow completes.
    /// If not provided, uses the configured frontend URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the Google flow - redirect to the identity provider.
async fn google_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FederatedStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    // Encode frontend URL + timestamp in state
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    // Create the data payload: "frontend_url|timestamp_hex"
    let state_payload = format!("{}|{:x}", frontend_url, timestamp);

    // Sign the payload
    let mut mac = HmacSha256::new_from_slice(&state.config.oauth_state_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    // Combine payload + signature: "payload|signature_hex", base64url-encoded
    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    let oauth_state = URL_SAFE_NO_PAD.encode(signed_state.as_bytes());

    // Get the host from the request headers for callback URL
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    let callback_url = format!(
        "{}://{}/auth/google/callback?state={}",
        scheme, host, oauth_state
    );

    let auth_url = state.provisioning.federated_authorize_url(&callback_url);

    tracing::info!(frontend_url = %frontend_url, "Starting Google flow, redirecting to provider");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Federated callback - exchange code for a session, provision, redirect.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    // Decode and verify frontend URL from state parameter
    let frontend_url = verify_and_decode_state(&params.state, &state.config.oauth_state_key)
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    // A flow the user abandoned or the provider rejected is not our error
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Federated flow returned an error");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let code = match params.code {
        Some(c) => c,
        None => {
            // Flow requires further user action; not an error
            tracing::info!("Federated callback without code, user action still pending");
            return Ok(Redirect::temporary(&frontend_url));
        }
    };

    let outcome = state.provisioning.complete_federated(&code).await?;

    tracing::info!(
        user_id = %outcome.identity.id,
        provisioned = outcome.profile.is_some(),
        "Federated sign-in complete"
    );

    // Create JWT session token and hand it to the frontend
    let jwt = create_jwt(&outcome.identity.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let redirect_url = format!("{}/callback?token={}", frontend_url, jwt);

    Ok(Redirect::temporary(&redirect_url))
}

/// Verify HMAC signature and decode the frontend URL from the state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let frontend_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}
