use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::{IdentityError, StoreError};
use shared_models::error::AppError;
use shared_models::{Profile, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub profile: Profile,
    /// Dashboard for the resolved role.
    pub redirect: String,
}

#[derive(Error, Debug)]
pub enum AuthCellError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<AuthCellError> for AppError {
    fn from(err: AuthCellError) -> Self {
        match err {
            AuthCellError::Store(e) => e.into(),
            AuthCellError::Identity(e) => e.into(),
            AuthCellError::Validation(msg) => AppError::ValidationError(msg),
        }
    }
}
