use assert_matches::assert_matches;
use tokio_test::assert_ok;
use serde_json::json;

use prescription_cell::models::{CreatePrescriptionRequest, Medicine, PrescriptionError};
use prescription_cell::services::PrescriptionService;
use shared_database::{DocumentStore, Filter};
use shared_models::{Profile, Role};
use shared_utils::test_utils::{MockDocuments, TestApp};

fn doctor() -> Profile {
    Profile::new("d1", "Grey", "grey@x.com", Role::Doctor)
}

#[tokio::test]
async fn test_blank_medicines_are_dropped_and_diagnosis_logged() {
    let app = TestApp::new();
    app.store.insert("patients", "p1", MockDocuments::patient("Jane", "j@x.com", None)).await.unwrap();

    let prescription = PrescriptionService::new(&app.state)
        .create_prescription(
            &doctor(),
            CreatePrescriptionRequest {
                patient_id: "p1".to_string(),
                diagnosis: " flu ".to_string(),
                medicines: vec![
                    Medicine::new("Paracetamol", "500mg", "Every 6 hours"),
                    Medicine::new("  ", "10mg", ""),
                ],
                notes: "Rest".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(prescription.medicines.len(), 1);
    assert_eq!(prescription.diagnosis, "flu");
    assert_eq!(prescription.patient_name.as_deref(), Some("Jane"));
    assert!(prescription.created_at.is_some());

    let logs = app.store.query("diagnosis_logs", &Filter::eq("patient_id", "p1")).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].get("symptoms"), Some(&json!("flu")));
    assert_eq!(logs[0].get("risk_level"), Some(&json!("Low")));
}

#[tokio::test]
async fn test_no_diagnosis_means_no_log() {
    let app = TestApp::new();

    let created = PrescriptionService::new(&app.state)
        .create_prescription(
            &doctor(),
            CreatePrescriptionRequest {
                patient_id: "p1".to_string(),
                medicines: vec![Medicine::new("Ibuprofen", "", "")],
                ..Default::default()
            },
        )
        .await;
    let prescription = assert_ok!(created);
    assert_eq!(prescription.diagnosis, "");

    assert_eq!(app.store.count("prescriptions").await, 1);
    assert_eq!(app.store.count("diagnosis_logs").await, 0);
}

#[tokio::test]
async fn test_validation_happens_before_any_write() {
    let app = TestApp::new();
    let service = PrescriptionService::new(&app.state);

    let no_medicine = service
        .create_prescription(
            &doctor(),
            CreatePrescriptionRequest {
                patient_id: "p1".to_string(),
                diagnosis: "flu".to_string(),
                medicines: vec![Medicine::new("", "5mg", "")],
                ..Default::default()
            },
        )
        .await;
    assert_matches!(no_medicine, Err(PrescriptionError::ValidationError(msg)) if msg == "Add at least one medicine.");

    let no_patient = service
        .create_prescription(
            &doctor(),
            CreatePrescriptionRequest {
                medicines: vec![Medicine::new("Ibuprofen", "", "")],
                ..Default::default()
            },
        )
        .await;
    assert_matches!(no_patient, Err(PrescriptionError::ValidationError(_)));

    assert_eq!(app.store.count("prescriptions").await, 0);
    assert_eq!(app.store.count("diagnosis_logs").await, 0);
}

#[tokio::test]
async fn test_failed_commit_writes_nothing() {
    let app = TestApp::new();
    app.store.set_read_only(true);

    let result = PrescriptionService::new(&app.state)
        .create_prescription(
            &doctor(),
            CreatePrescriptionRequest {
                patient_id: "p1".to_string(),
                diagnosis: "flu".to_string(),
                medicines: vec![Medicine::new("Ibuprofen", "", "")],
                ..Default::default()
            },
        )
        .await;

    assert_matches!(result, Err(PrescriptionError::Store(_)));
    app.store.set_read_only(false);
    assert_eq!(app.store.count("prescriptions").await, 0);
}

#[tokio::test]
async fn test_listing_sorts_newest_first_with_missing_dates_last() {
    let app = TestApp::new();
    app.store.insert("prescriptions", "old", MockDocuments::prescription("p1", "d1", "2024-01-01T00:00:00Z")).await.unwrap();
    app.store.insert("prescriptions", "new", MockDocuments::prescription("p1", "d1", "2024-05-01T00:00:00Z")).await.unwrap();
    app.store
        .insert("prescriptions", "undated", json!({ "patient_id": "p1", "doctor_id": "d1", "medicines": [] }))
        .await
        .unwrap();
    app.store.insert("prescriptions", "other", MockDocuments::prescription("p2", "d2", "2024-03-01T00:00:00Z")).await.unwrap();

    let service = PrescriptionService::new(&app.state);
    let ids: Vec<String> = service.list_for_patient("p1").await.unwrap().into_iter().map(|rx| rx.id).collect();
    assert_eq!(ids, vec!["new", "old", "undated"]);

    assert_eq!(service.list_for_doctor("d2").await.unwrap().len(), 1);
    assert_matches!(service.get_prescription("missing").await, Err(PrescriptionError::NotFound));
}
