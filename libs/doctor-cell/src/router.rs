use axum::{routing::get, Router};

use auth_cell::middleware::protect;
use shared_database::AppState;
use shared_models::Role;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    let staff_routes = protect(
        Router::new().route(
            "/me",
            get(handlers::get_own_staff_record).put(handlers::update_own_staff_record),
        ),
        &state,
        &[Role::Doctor, Role::Receptionist],
    );

    // Every signed-in role picks doctors from this directory.
    let directory_routes = protect(
        Router::new().route("/", get(handlers::list_doctors)),
        &state,
        &[],
    );

    Router::new()
        .merge(staff_routes)
        .merge(directory_routes)
        .with_state(state)
}
