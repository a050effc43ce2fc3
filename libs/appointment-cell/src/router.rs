use axum::{
    routing::{get, post, put},
    Router,
};

use auth_cell::middleware::protect;
use shared_database::AppState;
use shared_models::Role;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    let signed_in_routes = protect(
        Router::new()
            .route("/", get(handlers::list_appointments))
            .route("/{appointment_id}", get(handlers::get_appointment)),
        &state,
        &[],
    );

    let patient_routes = protect(
        Router::new().route("/book", post(handlers::book_appointment)),
        &state,
        &[Role::Patient],
    );

    let front_desk_routes = protect(
        Router::new().route("/reception", post(handlers::book_at_reception)),
        &state,
        &[Role::Receptionist, Role::Admin],
    );

    let status_routes = protect(
        Router::new().route("/{appointment_id}/status", put(handlers::update_status)),
        &state,
        &[Role::Doctor, Role::Receptionist, Role::Admin],
    );

    Router::new()
        .merge(signed_in_routes)
        .merge(patient_routes)
        .merge(front_desk_routes)
        .merge(status_routes)
        .with_state(state)
}
