use axum::{
    routing::{get, post},
    Router,
};

use auth_cell::middleware::protect;
use shared_database::AppState;
use shared_models::Role;

use crate::handlers;

pub fn dashboard_routes(state: AppState) -> Router {
    let doctor_routes = protect(
        Router::new().route("/doctor", get(handlers::doctor_dashboard)),
        &state,
        &[Role::Doctor],
    );

    let patient_routes = protect(
        Router::new().route("/patient", get(handlers::patient_dashboard)),
        &state,
        &[Role::Patient],
    );

    let front_desk_routes = protect(
        Router::new().route("/receptionist", get(handlers::receptionist_dashboard)),
        &state,
        &[Role::Receptionist, Role::Admin],
    );

    let timeline_routes = protect(
        Router::new().route("/patients/{patient_id}/timeline", get(handlers::patient_timeline)),
        &state,
        &[Role::Doctor, Role::Admin],
    );

    let status_routes = protect(
        Router::new().route("/appointments/{appointment_id}/status", post(handlers::change_status)),
        &state,
        &[Role::Doctor, Role::Receptionist, Role::Admin],
    );

    Router::new()
        .merge(doctor_routes)
        .merge(patient_routes)
        .merge(front_desk_routes)
        .merge(timeline_routes)
        .merge(status_routes)
        .with_state(state)
}
