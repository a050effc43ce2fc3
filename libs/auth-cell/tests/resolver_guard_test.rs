use assert_matches::assert_matches;
use serde_json::json;

use auth_cell::services::{AuthorizationGuard, IdentityResolver};
use shared_database::store::{DocumentStore, Filter};
use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_models::{PatientRecord, Role};
use shared_utils::test_utils::{MockDocuments, TestApp, TestUser};

#[tokio::test]
async fn test_fresh_principal_is_provisioned_once() {
    let app = TestApp::new();
    let resolver = IdentityResolver::new(&app.state);
    let principal = Principal::new("fresh-1", Some("new@x.com"), Some("Nia New"));

    let profile = resolver.resolve(&principal).await.unwrap();
    assert_eq!(profile.role(), Role::Patient);
    assert_eq!(profile.name, "Nia New");
    assert_eq!(profile.plan, "Free");
    assert!(profile.created_at.is_some());

    assert_eq!(app.store.count("users").await, 1);
    assert_eq!(app.store.count("patients").await, 1);

    let record: PatientRecord = app.store.get("patients", "fresh-1").await.unwrap().unwrap().decode().unwrap();
    assert_eq!(record.user_id.as_deref(), Some("fresh-1"));
    assert_eq!(record.created_by, "fresh-1");
    assert_eq!(record.age, None);

    let again = resolver.resolve(&principal).await.unwrap();
    assert_eq!(again.id, profile.id);
    assert_eq!(app.store.count("users").await, 1);
    assert_eq!(app.store.count("patients").await, 1);
}

#[tokio::test]
async fn test_missing_display_name_uses_placeholder() {
    let app = TestApp::new();
    let profile = IdentityResolver::new(&app.state)
        .resolve(&Principal::new("anon-1", Some("anon@x.com"), None))
        .await
        .unwrap();

    assert_eq!(profile.name, "New Patient");
}

#[tokio::test]
async fn test_receptionist_record_is_linked_by_email() {
    let app = TestApp::new();
    app.store
        .insert("patients", "rec-jane", MockDocuments::patient("Jane", "j@x.com", None))
        .await
        .unwrap();

    let principal = Principal::new("jane-uid", Some("j@x.com"), Some("Jane D"));
    let profile = IdentityResolver::new(&app.state).resolve(&principal).await.unwrap();

    assert_eq!(profile.name, "Jane");
    assert_eq!(profile.role(), Role::Patient);
    assert_eq!(app.store.count("patients").await, 1);

    let record: PatientRecord = app.store.get("patients", "rec-jane").await.unwrap().unwrap().decode().unwrap();
    assert_eq!(record.user_id.as_deref(), Some("jane-uid"));
}

#[tokio::test]
async fn test_mixed_case_email_links_lowercased_record() {
    let app = TestApp::new();
    app.store
        .insert("patients", "rec-jane", MockDocuments::patient("Jane", "jane@x.com", None))
        .await
        .unwrap();

    let principal = Principal::new("jane-uid", Some(" Jane@X.com "), Some("Jane D"));
    let profile = IdentityResolver::new(&app.state).resolve(&principal).await.unwrap();

    assert_eq!(profile.name, "Jane");
    assert_eq!(profile.email, "jane@x.com");
    assert_eq!(app.store.count("patients").await, 1);
    assert_eq!(app.store.count("users").await, 1);

    let record: PatientRecord = app.store.get("patients", "rec-jane").await.unwrap().unwrap().decode().unwrap();
    assert_eq!(record.user_id.as_deref(), Some("jane-uid"));
}

#[tokio::test]
async fn test_failed_provisioning_writes_nothing() {
    let app = TestApp::new();
    app.store.set_read_only(true);

    let result = IdentityResolver::new(&app.state)
        .resolve(&Principal::new("ro-1", Some("ro@x.com"), None))
        .await;

    assert!(result.is_err());
    assert_eq!(app.store.count("patients").await, 0);
    assert_eq!(app.store.count("users").await, 0);
}

#[tokio::test]
async fn test_duplicate_emails_link_first_match_only() {
    let app = TestApp::new();
    app.store.insert("patients", "dup-1", MockDocuments::patient("First", "d@x.com", None)).await.unwrap();
    app.store.insert("patients", "dup-2", MockDocuments::patient("Second", "d@x.com", None)).await.unwrap();

    let profile = IdentityResolver::new(&app.state)
        .resolve(&Principal::new("dup-uid", Some("d@x.com"), None))
        .await
        .unwrap();
    assert_eq!(profile.name, "First");

    let linked = app.store.query("patients", &Filter::eq("user_id", "dup-uid")).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, "dup-1");
}

#[tokio::test]
async fn test_stored_profile_without_role_defaults_to_patient() {
    let app = TestApp::new();
    app.store
        .insert("users", "legacy", json!({ "name": "Old", "email": "old@x.com" }))
        .await
        .unwrap();

    let profile = IdentityResolver::new(&app.state)
        .resolve(&Principal::new("legacy", Some("old@x.com"), None))
        .await
        .unwrap();

    assert_eq!(profile.role(), Role::Patient);
    assert_eq!(app.store.count("patients").await, 0);
}

#[tokio::test]
async fn test_guard_admits_allowed_roles() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("doc@x.com");
    doctor.seed(&app.store).await;

    let guard = AuthorizationGuard::new(&app.state);
    let context = guard
        .authorize(doctor.to_principal(), "tok-doc", &[Role::Doctor])
        .await
        .unwrap();

    assert_eq!(context.role(), Role::Doctor);
    assert_eq!(context.access_token, "tok-doc");
    assert!(app.identity.revoked_tokens().await.is_empty());
}

#[tokio::test]
async fn test_guard_denial_signs_out() {
    let app = TestApp::new();
    let patient = TestUser::patient("pat@x.com");
    patient.seed(&app.store).await;

    let guard = AuthorizationGuard::new(&app.state);
    let result = guard
        .authorize(patient.to_principal(), "tok-pat", &[Role::Doctor, Role::Admin])
        .await;

    assert_matches!(result, Err(AppError::AccessDenied(_)));
    assert_eq!(app.identity.revoked_tokens().await, vec!["tok-pat".to_string()]);
}

#[tokio::test]
async fn test_empty_allow_list_admits_everyone() {
    let app = TestApp::new();
    for user in [TestUser::admin("a@x.com"), TestUser::receptionist("r@x.com"), TestUser::patient("p@x.com")] {
        user.seed(&app.store).await;
        let context = AuthorizationGuard::new(&app.state)
            .authorize(user.to_principal(), "tok", &[])
            .await
            .unwrap();
        assert_eq!(context.role(), user.role);
    }
}

#[tokio::test]
async fn test_resolver_failure_terminates_session() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    let result = AuthorizationGuard::new(&app.state)
        .authorize(Principal::new("u1", Some("u1@x.com"), None), "tok-u1", &[Role::Patient])
        .await;

    assert_matches!(result, Err(AppError::SessionTerminated(_)));
    assert_eq!(app.identity.revoked_tokens().await, vec!["tok-u1".to_string()]);
}
