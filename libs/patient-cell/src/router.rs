use axum::{routing::get, Router};

use auth_cell::middleware::protect;
use shared_database::AppState;
use shared_models::Role;

use crate::handlers;

pub fn patient_routes(state: AppState) -> Router {
    let front_desk_routes = protect(
        Router::new()
            .route("/", get(handlers::list_patients).post(handlers::register_patient))
            .route("/{patient_id}", get(handlers::get_patient).put(handlers::update_patient)),
        &state,
        &[Role::Receptionist, Role::Admin],
    );

    let patient_self_routes = protect(
        Router::new().route("/me", get(handlers::get_own_record)),
        &state,
        &[Role::Patient],
    );

    Router::new()
        .merge(front_desk_routes)
        .merge(patient_self_routes)
        .with_state(state)
}
