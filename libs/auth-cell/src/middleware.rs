use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};

use shared_database::AppState;
use shared_models::error::AppError;
use shared_models::Role;
use shared_utils::extractor::{auth_middleware, extract_principal, BearerToken};

use crate::services::guard::AuthorizationGuard;
use crate::services::session::SessionGate;

#[derive(Clone)]
pub struct GuardLayerState {
    pub app: AppState,
    pub allowed: Arc<[Role]>,
}

/// Runs the authorization guard for a route group. Expects `auth_middleware`
/// to have stored the principal and token already.
pub async fn require_roles(
    State(guard): State<GuardLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let principal = extract_principal(&request)?;
    let token = request
        .extensions()
        .get::<BearerToken>()
        .map(|bearer| bearer.0.clone())
        .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

    let gate = SessionGate::new();
    request.extensions_mut().insert(gate.clone());

    let context = AuthorizationGuard::new(&guard.app)
        .authorize(principal, &token, &guard.allowed)
        .await?;

    gate.publish(context.clone());
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Wraps a route group with token validation followed by the role guard.
pub fn protect(router: Router<AppState>, state: &AppState, allowed: &[Role]) -> Router<AppState> {
    let guard = GuardLayerState {
        app: state.clone(),
        allowed: Arc::from(allowed),
    };

    router
        .layer(middleware::from_fn_with_state(guard, require_roles))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
