use axum::{
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_models::Role;

use crate::handlers;
use crate::middleware::protect;

pub fn auth_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/validate", post(handlers::validate_token))
        .route("/verify", post(handlers::verify_token))
        .route("/sign-in", post(handlers::sign_in))
        .route("/sign-up", post(handlers::sign_up))
        .route("/sign-out", post(handlers::sign_out));

    let signed_in_routes = protect(
        Router::new().route("/profile", get(handlers::get_profile)),
        &state,
        &[],
    );

    let admin_routes = protect(
        Router::new().route("/staff", post(handlers::register_staff)),
        &state,
        &[Role::Admin],
    );

    Router::new()
        .merge(public_routes)
        .merge(signed_in_routes)
        .merge(admin_routes)
        .with_state(state)
}
