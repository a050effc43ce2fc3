use assert_matches::assert_matches;
use serde_json::json;

use patient_cell::models::{PatientError, RegisterPatientRequest, UpdatePatientRequest};
use patient_cell::services::PatientService;
use shared_database::store::DocumentStore;
use shared_models::{Profile, Role};
use shared_utils::test_utils::{MockDocuments, TestApp};

fn request(name: &str, email: &str, password: Option<&str>) -> RegisterPatientRequest {
    RegisterPatientRequest {
        name: name.to_string(),
        age: Some(30),
        gender: "Female".to_string(),
        contact: "555-0101".to_string(),
        email: email.to_string(),
        password: password.map(str::to_string),
    }
}

#[tokio::test]
async fn test_register_without_account_adds_unlinked_record() {
    let app = TestApp::new();
    let service = PatientService::new(&app.state);

    let patient = service.register_patient(request("Jane", "J@x.com", None), "rec-1").await.unwrap();

    assert_eq!(patient.name, "Jane");
    assert_eq!(patient.email, "j@x.com");
    assert_eq!(patient.user_id, None);
    assert_eq!(patient.created_by, "rec-1");
    assert!(patient.created_at.is_some());
    assert_eq!(app.store.count("users").await, 0);
}

#[tokio::test]
async fn test_register_with_account_keys_record_by_uid() {
    let app = TestApp::new();
    let service = PatientService::new(&app.state);

    let patient = service
        .register_patient(request("Sam", "sam@x.com", Some("secret1")), "rec-1")
        .await
        .unwrap();

    let principal = app.identity.find_by_email("sam@x.com").await.unwrap();
    assert_eq!(patient.id, principal.id);
    assert_eq!(patient.user_id.as_deref(), Some(principal.id.as_str()));

    let profile: Profile = app.store.get("users", &principal.id).await.unwrap().unwrap().decode().unwrap();
    assert_eq!(profile.role(), Role::Patient);
}

#[tokio::test]
async fn test_register_requires_name_before_writing() {
    let app = TestApp::new();
    let result = PatientService::new(&app.state)
        .register_patient(request("  ", "x@x.com", Some("secret1")), "rec-1")
        .await;

    assert_matches!(result, Err(PatientError::ValidationError(_)));
    assert_eq!(app.store.count("patients").await, 0);
    assert!(app.identity.find_by_email("x@x.com").await.is_none());
}

#[tokio::test]
async fn test_update_keeps_email_and_binding() {
    let app = TestApp::new();
    app.store.insert("patients", "p1", MockDocuments::patient("Jane", "j@x.com", Some("uid-1"))).await.unwrap();
    let service = PatientService::new(&app.state);

    let updated = service
        .update_patient(
            "p1",
            UpdatePatientRequest { name: "Jane Doe".to_string(), age: None, gender: "Female".to_string(), contact: "555".to_string() },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Jane Doe");
    assert_eq!(updated.age, None);
    assert_eq!(updated.email, "j@x.com");
    assert_eq!(updated.user_id.as_deref(), Some("uid-1"));

    let missing = service
        .update_patient("ghost", UpdatePatientRequest { name: "X".to_string(), ..Default::default() })
        .await;
    assert_matches!(missing, Err(PatientError::Store(_)));
}

#[tokio::test]
async fn test_search_matches_name_or_contact() {
    let app = TestApp::new();
    app.store.insert("patients", "p1", json!({ "name": "Alice Smith", "contact": "555-1000" })).await.unwrap();
    app.store.insert("patients", "p2", json!({ "name": "Bob Jones", "contact": "555-2000" })).await.unwrap();
    let service = PatientService::new(&app.state);

    let by_name = service.search_patients("alice").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, "p1");

    let by_contact = service.search_patients("2000").await.unwrap();
    assert_eq!(by_contact[0].id, "p2");

    assert_eq!(service.search_patients("").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_resolve_own_record_fallbacks() {
    let app = TestApp::new();
    let service = PatientService::new(&app.state);

    app.store.insert("patients", "rec-9", MockDocuments::patient("Linked", "l@x.com", Some("uid-9"))).await.unwrap();
    let linked = service
        .resolve_own_record(&Profile::new("uid-9", "Linked", "l@x.com", Role::Patient))
        .await
        .unwrap();
    assert_eq!(linked.id, "rec-9");

    app.store.insert("patients", "uid-7", MockDocuments::patient("Direct", "d@x.com", None)).await.unwrap();
    let direct = service
        .resolve_own_record(&Profile::new("uid-7", "Direct", "d@x.com", Role::Patient))
        .await
        .unwrap();
    assert_eq!(direct.name, "Direct");

    let placeholder = service
        .resolve_own_record(&Profile::new("uid-0", "Nobody", "n@x.com", Role::Patient))
        .await
        .unwrap();
    assert_eq!(placeholder.id, "uid-0");
    assert_eq!(placeholder.name, "Nobody");
}

#[tokio::test]
async fn test_find_by_email_and_user_id() {
    let app = TestApp::new();
    app.store.insert("patients", "p1", MockDocuments::patient("Jane", "j@x.com", Some("uid-1"))).await.unwrap();
    let service = PatientService::new(&app.state);

    assert_eq!(service.find_by_email("J@x.com").await.unwrap().unwrap().id, "p1");
    assert_eq!(service.find_by_user_id("uid-1").await.unwrap().unwrap().id, "p1");
    assert!(service.find_by_user_id("uid-2").await.unwrap().is_none());
}
