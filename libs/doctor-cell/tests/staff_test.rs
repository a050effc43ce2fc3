use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use doctor_cell::models::{StaffError, UpdateStaffRequest};
use doctor_cell::router::doctor_routes;
use doctor_cell::services::StaffService;
use shared_database::store::DocumentStore;
use shared_models::{Profile, Role};
use shared_utils::test_utils::{TestApp, TestUser};

fn profile_of(user: &TestUser) -> Profile {
    Profile::new(&user.id, &user.name, &user.email, user.role)
}

#[tokio::test]
async fn test_missing_staff_record_falls_back_to_profile() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("grey@x.com");
    doctor.seed(&app.store).await;

    let record = StaffService::new(&app.state).get_staff_record(&profile_of(&doctor)).await.unwrap();

    assert_eq!(record.id, doctor.id);
    assert_eq!(record.name, doctor.name);
    assert_eq!(record.specialization_label(), "General Practitioner");
}

#[tokio::test]
async fn test_update_renames_profile_in_same_batch() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("grey@x.com");
    doctor.seed(&app.store).await;

    let record = StaffService::new(&app.state)
        .update_staff_record(
            &profile_of(&doctor),
            UpdateStaffRequest {
                name: "Meredith Grey".to_string(),
                specialization: "Surgery".to_string(),
                experience: "15".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(record.specialization, "Surgery");
    assert_eq!(record.email, "grey@x.com");

    let user = app.store.get("users", &doctor.id).await.unwrap().unwrap();
    assert_eq!(user.get("name"), Some(&json!("Meredith Grey")));
    assert_eq!(user.get("role"), Some(&json!("Doctor")));
}

#[tokio::test]
async fn test_failed_batch_changes_nothing() {
    let app = TestApp::new();
    let doctor = TestUser::doctor("ghost@x.com");

    // No users document, so the rename half of the batch cannot apply.
    let result = StaffService::new(&app.state)
        .update_staff_record(&profile_of(&doctor), UpdateStaffRequest { name: "Ghost".to_string(), ..Default::default() })
        .await;

    assert_matches!(result, Err(StaffError::Store(_)));
    assert_eq!(app.store.count("doctors").await, 0);
}

#[tokio::test]
async fn test_update_requires_name_and_staff_role() {
    let app = TestApp::new();
    let service = StaffService::new(&app.state);
    let doctor = TestUser::doctor("d@x.com");

    assert_matches!(
        service.update_staff_record(&profile_of(&doctor), UpdateStaffRequest::default()).await,
        Err(StaffError::ValidationError(_))
    );

    let patient = TestUser::patient("p@x.com");
    assert_matches!(
        service.get_staff_record(&profile_of(&patient)).await,
        Err(StaffError::NotStaff)
    );
}

#[tokio::test]
async fn test_doctor_directory_lists_only_doctors() {
    let app = TestApp::new();
    for user in [
        TestUser::new("b@x.com", "Dr. Banner", Role::Doctor),
        TestUser::new("a@x.com", "Dr. Adams", Role::Doctor),
        TestUser::receptionist("r@x.com"),
    ] {
        user.seed(&app.store).await;
    }

    let patient = TestUser::patient("p@x.com");
    let bearer = app.sign_in_as(&patient).await;

    let request = Request::builder().uri("/").header("authorization", bearer).body(Body::empty()).unwrap();
    let response = doctor_routes(app.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["doctors"][0]["name"], "Dr. Adams");
}

#[tokio::test]
async fn test_staff_me_route() {
    let app = TestApp::new();
    let receptionist = TestUser::receptionist("desk@x.com");
    let bearer = app.sign_in_as(&receptionist).await;

    let request = Request::builder()
        .method("PUT")
        .uri("/me")
        .header("authorization", &bearer)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "Rita D.", "contact": "555-0199" }).to_string()))
        .unwrap();
    let response = doctor_routes(app.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["record"]["name"], "Rita D.");
    assert_eq!(json["display"]["contact"], "555-0199");
    assert_eq!(app.store.count("receptionists").await, 1);
}
