// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provisioning reconciliation tests.
//!
//! Many concurrent signed-in observations of the same identity must
//! converge on exactly one profile row, across service instances too.

use chrono::Utc;
use tutorlink::models::{Identity, Profile};
use tutorlink::services::{IdentityClient, ProvisioningService};
use tutorlink::store::RowStore;

fn test_identity(id: &str, first: &str, last: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        external_accounts: vec![],
    }
}

#[tokio::test]
async fn test_concurrent_provisioning_single_row() {
    let store = RowStore::new_memory();
    let service = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());
    let identity = test_identity("user_1", "Ada", "Lovelace");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        let identity = identity.clone();
        handles.push(tokio::spawn(
            async move { service.ensure_profile(&identity).await },
        ));
    }

    let mut profiles = Vec::new();
    for handle in handles {
        let profile = handle
            .await
            .unwrap()
            .expect("ensure_profile should not fail")
            .expect("every caller should see a profile");
        profiles.push(profile);
    }

    // Every caller converged on the same row
    let first = &profiles[0];
    for p in &profiles {
        assert_eq!(p.user_id, first.user_id);
        assert_eq!(p.created_at, first.created_at);
    }

    let stored = store.get_profile("user_1").await.unwrap().unwrap();
    assert_eq!(stored.first_name, "Ada");
    assert_eq!(stored.last_name, "Lovelace");
}

#[tokio::test]
async fn test_cross_instance_race_absorbs_conflict() {
    // Two service instances sharing one store, as in a scaled deployment.
    // The loser of the create race must absorb the conflict and return the
    // winner's row.
    let store = RowStore::new_memory();
    let a = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());
    let b = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());
    let identity = test_identity("user_2", "Grace", "Hopper");

    let (ra, rb) = tokio::join!(a.ensure_profile(&identity), b.ensure_profile(&identity));

    let pa = ra.unwrap().expect("instance A should see a profile");
    let pb = rb.unwrap().expect("instance B should see a profile");

    assert_eq!(pa.user_id, pb.user_id);
    assert_eq!(pa.created_at, pb.created_at);
}

#[tokio::test]
async fn test_existing_profile_is_never_replaced() {
    let store = RowStore::new_memory();

    // A profile already exists with user-edited names
    let mut existing = Profile::provisioned("user_3", "Edited", "Name", &Utc::now().to_rfc3339());
    existing.biography = Some("Twenty years of teaching".to_string());
    store.create_profile(&existing).await.unwrap();

    let service = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());

    // The provider reports different names; provisioning must not touch the row
    let identity = test_identity("user_3", "Provider", "Reported");
    let profile = service.ensure_profile(&identity).await.unwrap().unwrap();

    assert_eq!(profile.first_name, "Edited");
    assert_eq!(profile.last_name, "Name");
    assert_eq!(
        profile.biography.as_deref(),
        Some("Twenty years of teaching")
    );
}

#[tokio::test]
async fn test_deferred_signup_provisions_on_first_signin() {
    let store = RowStore::new_memory();
    let identity = IdentityClient::new_memory(true); // provider requires email confirmation
    let service = ProvisioningService::new(identity.clone(), store.clone());

    let outcome = service
        .sign_up("ada@example.com", "correct-horse", Some("Ada"), Some("Lovelace"))
        .await
        .unwrap();

    assert!(outcome.needs_email_confirmation);
    assert!(outcome.profile.is_none());

    // No signed-in observation has happened yet, so no row either
    assert!(store
        .get_profile(&outcome.identity.id)
        .await
        .unwrap()
        .is_none());

    // User clicks the confirmation link, then signs in
    identity.confirm_email("ada@example.com");
    let signin = service
        .sign_in("ada@example.com", "correct-horse")
        .await
        .unwrap();

    let profile = signin.profile.expect("first sign-in should provision");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.last_name, "Lovelace");
}

#[tokio::test]
async fn test_sign_out_keeps_profile_row() {
    let store = RowStore::new_memory();
    let service = ProvisioningService::new(IdentityClient::new_memory(false), store.clone());

    let outcome = service
        .sign_up("grace@example.com", "password123", Some("Grace"), None)
        .await
        .unwrap();
    let user_id = outcome.identity.id.clone();
    assert!(outcome.profile.is_some());

    service.sign_out(&user_id).await.unwrap();

    // Session caches are gone but the row survives
    assert!(service.cached_profile(&user_id).is_none());
    assert!(store.get_profile(&user_id).await.unwrap().is_some());
}
