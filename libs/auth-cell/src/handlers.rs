use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_models::Profile;
use shared_utils::extractor::extract_bearer_token;
use shared_utils::jwt::validate_token as validate_jwt;

use crate::models::{RegisterStaffRequest, SignInRequest, SignInResponse, SignUpRequest};
use crate::services::{AccountService, IdentityResolver, SessionContext};

pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let principal = validate_jwt(&token, &state.config.supabase_jwt_secret).map_err(AppError::Auth)?;

    // Read-only: validation never provisions a profile.
    let role = IdentityResolver::new(&state)
        .lookup(&principal.id)
        .await?
        .map(|profile| profile.role().to_string());

    Ok(Json(TokenResponse {
        valid: true,
        user_id: principal.id,
        email: principal.email,
        role,
    }))
}

pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = validate_jwt(&token, &state.config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

#[axum::debug_handler]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let response = AccountService::new(&state).sign_in(request).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = AccountService::new(&state).sign_up(request).await?;

    Ok(Json(json!({
        "profile": profile,
        "redirect": profile.role().dashboard_path()
    })))
}

#[axum::debug_handler]
pub async fn register_staff(
    State(state): State<AppState>,
    Json(request): Json<RegisterStaffRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = AccountService::new(&state).register_staff(request).await?;
    Ok(Json(profile))
}

#[axum::debug_handler]
pub async fn sign_out(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&state).sign_out(auth.token()).await?;
    Ok(Json(json!({ "success": true, "redirect": "/" })))
}

#[axum::debug_handler]
pub async fn get_profile(
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", session.principal.id);

    Ok(Json(json!({
        "user_id": session.principal.id,
        "profile": session.profile,
        "redirect": session.role().dashboard_path()
    })))
}
