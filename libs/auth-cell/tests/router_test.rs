use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_cell::router::auth_routes;
use shared_database::store::DocumentStore;
use shared_utils::test_utils::{JwtTestUtils, TestApp, TestUser};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, json)
}

fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", bearer);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_sign_up_then_sign_in_redirects_patient() {
    let app = TestApp::new();

    let (status, body) = send(
        auth_routes(app.state.clone()),
        post_json("/sign-up", json!({ "name": "Pat", "email": "Pat@X.com", "password": "secret1" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["role"], "Patient");
    assert_eq!(body["redirect"], "/dashboard/patient");

    let (status, body) = send(
        auth_routes(app.state.clone()),
        post_json("/sign-in", json!({ "email": "pat@x.com", "password": "secret1" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/dashboard/patient");
    assert!(body["access_token"].as_str().unwrap().contains('.'));
    assert_eq!(app.store.count("users").await, 1);
    assert_eq!(app.store.count("patients").await, 1);
}

#[tokio::test]
async fn test_sign_in_errors_use_friendly_messages() {
    let app = TestApp::new();

    let (status, body) = send(
        auth_routes(app.state.clone()),
        post_json("/sign-in", json!({ "email": "ghost@x.com", "password": "secret1" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password.");

    let (status, body) = send(
        auth_routes(app.state.clone()),
        post_json("/sign-up", json!({ "name": "Short", "email": "s@x.com", "password": "123" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters.");
}

#[tokio::test]
async fn test_profile_requires_valid_token() {
    let app = TestApp::new();
    let user = TestUser::doctor("doc@x.com");
    let bearer = app.sign_in_as(&user).await;

    let request = Request::builder().uri("/profile").header("authorization", bearer).body(Body::empty()).unwrap();
    let (status, body) = send(auth_routes(app.state.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["role"], "Doctor");
    assert_eq!(body["redirect"], "/dashboard/doctor");

    let expired = format!("Bearer {}", JwtTestUtils::create_expired_token(&user, &app.config.jwt_secret));
    let request = Request::builder().uri("/profile").header("authorization", expired).body(Body::empty()).unwrap();
    let (status, _) = send(auth_routes(app.state.clone()), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for token in [JwtTestUtils::create_invalid_signature_token(&user), JwtTestUtils::create_malformed_token()] {
        let request = Request::builder()
            .uri("/profile")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(auth_routes(app.state.clone()), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_staff_registration_is_admin_only() {
    let app = TestApp::new();
    let receptionist = TestUser::receptionist("desk@x.com");
    let bearer = app.sign_in_as(&receptionist).await;

    let staff = json!({ "name": "Dr. House", "email": "house@x.com", "password": "vicodin", "role": "Doctor" });

    let (status, body) = send(auth_routes(app.state.clone()), post_json("/staff", staff.clone(), Some(&bearer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/");
    assert_eq!(app.identity.revoked_tokens().await.len(), 1);

    let admin = TestUser::admin("boss@x.com");
    let bearer = app.sign_in_as(&admin).await;
    let (status, body) = send(auth_routes(app.state.clone()), post_json("/staff", staff, Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Doctor");

    let doctor_id = body["id"].as_str().unwrap();
    let record = app.store.get("doctors", doctor_id).await.unwrap().unwrap();
    assert_eq!(record.get("name"), Some(&json!("Dr. House")));

    let (status, body) = send(
        auth_routes(app.state.clone()),
        post_json("/sign-in", json!({ "email": "house@x.com", "password": "vicodin" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/dashboard/doctor");
}

#[tokio::test]
async fn test_validate_reports_role_without_provisioning() {
    let app = TestApp::new();
    let user = TestUser::receptionist("r@x.com");
    let bearer = app.sign_in_as(&user).await;

    let (status, body) = send(auth_routes(app.state.clone()), post_json("/validate", json!({}), Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["role"], "Receptionist");

    let stranger = TestUser::patient("s@x.com");
    let token = format!("Bearer {}", JwtTestUtils::create_test_token(&stranger, &app.config.jwt_secret, None));
    let (_, body) = send(auth_routes(app.state.clone()), post_json("/validate", json!({}), Some(&token))).await;
    assert_eq!(body["role"], Value::Null);
    assert_eq!(app.store.count("patients").await, 0);

    let (_, body) = send(
        auth_routes(app.state.clone()),
        post_json("/verify", json!({}), Some("Bearer invalid.token.format")),
    )
    .await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_sign_out_revokes_token() {
    let app = TestApp::new();
    let (status, body) = send(auth_routes(app.state.clone()), post_json("/sign-out", json!({}), Some("Bearer tok-1"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/");
    assert_eq!(app.identity.revoked_tokens().await, vec!["tok-1".to_string()]);
}
