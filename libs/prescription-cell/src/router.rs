use axum::{
    routing::{get, post},
    Router,
};

use auth_cell::middleware::protect;
use shared_database::AppState;
use shared_models::Role;

use crate::handlers;

pub fn prescription_routes(state: AppState) -> Router {
    let doctor_routes = protect(
        Router::new().route("/issue", post(handlers::create_prescription)),
        &state,
        &[Role::Doctor],
    );

    let reader_routes = protect(
        Router::new()
            .route("/", get(handlers::list_prescriptions))
            .route("/{prescription_id}", get(handlers::get_prescription))
            .route("/{prescription_id}/export", get(handlers::export_prescription)),
        &state,
        &[Role::Doctor, Role::Patient, Role::Admin],
    );

    Router::new()
        .merge(doctor_routes)
        .merge(reader_routes)
        .with_state(state)
}
