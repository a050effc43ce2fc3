use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use prescription_cell::router::prescription_routes;
use shared_utils::test_utils::{MockDocuments, TestApp, TestUser};

async fn call(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = prescription_routes(app.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn get_request(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder().uri(uri).header("authorization", bearer).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_doctor_issues_and_lists() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("grey@x.com");
    let bearer = app.sign_in_as(&doctor).await;

    let request = Request::builder()
        .method("POST")
        .uri("/issue")
        .header("authorization", &bearer)
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "patient_id": "p1",
                "diagnosis": "flu",
                "medicines": [{ "name": "Paracetamol", "dosage": "500mg", "instruction": "Twice daily" }]
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor_id"], doctor.id.as_str());

    let (status, body) = call(&app, get_request("/", &bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_patient_exports_own_prescription() {
    let app = TestApp::new();
    let patient = TestUser::patient("pat@x.com");
    let bearer = app.sign_in_as(&patient).await;
    app.store
        .insert("prescriptions", "rx1", MockDocuments::prescription(&patient.id, "d1", "2024-06-15T10:00:00Z"))
        .await
        .unwrap();

    let (status, body) = call(&app, get_request("/rx1/export", &bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_name"], "prescription_Pat_Ient_2024-06-15.pdf");
    assert_eq!(body["page_width"], 210.0);
    assert_eq!(body["pages"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["pages"][0][0]["op"], "fill_color");
}

#[tokio::test]
async fn test_other_patients_prescription_is_hidden() {
    let app = TestApp::new();
    let bearer = app.sign_in_as(&TestUser::patient("pat@x.com")).await;
    app.store
        .insert("prescriptions", "rx1", MockDocuments::prescription("someone-else", "d1", "2024-06-15T10:00:00Z"))
        .await
        .unwrap();

    let (status, _) = call(&app, get_request("/rx1", &bearer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_receptionist_cannot_read_prescriptions() {
    let app = TestApp::new();
    let bearer = app.sign_in_as(&TestUser::receptionist("desk@x.com")).await;

    let (status, body) = call(&app, get_request("/", &bearer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/");
}
