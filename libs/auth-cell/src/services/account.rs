use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use shared_database::store::{collections, server_timestamp, DocumentStore, WriteBatch};
use shared_database::{AppState, IdentityProvider};
use shared_models::{Profile, Role};

use crate::models::{AuthCellError, RegisterStaffRequest, SignInRequest, SignInResponse, SignUpRequest};
use crate::services::resolver::IdentityResolver;

pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    resolver: IdentityResolver,
}

impl AccountService {
    pub fn new(state: &AppState) -> Self {
        Self {
            identity: state.identity.clone(),
            store: state.store.clone(),
            resolver: IdentityResolver::new(state),
        }
    }

    /// Signs in and points the caller at the dashboard for their role.
    pub async fn sign_in(&self, request: SignInRequest) -> Result<SignInResponse, AuthCellError> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthCellError::Validation("Email and password are required.".to_string()));
        }

        let session = self.identity.sign_in(email, &request.password).await?;

        let profile = match self.resolver.resolve(&session.principal).await {
            Ok(profile) => profile,
            Err(err) => {
                if let Err(sign_out_err) = self.identity.sign_out(&session.access_token).await {
                    warn!("Sign-out after failed resolution errored: {}", sign_out_err);
                }
                return Err(err);
            }
        };

        info!("{} signed in as {}", profile.id, profile.role());

        Ok(SignInResponse {
            redirect: profile.role().dashboard_path().to_string(),
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            profile,
        })
    }

    /// Patient self-registration; provisioning matches a first sign-in.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Profile, AuthCellError> {
        let (name, email) = validate_identity_fields(&request.name, &request.email)?;
        let principal = self.identity.sign_up(&email, &request.password, &name).await?;
        self.resolver.resolve(&principal).await
    }

    /// Creates a staff account with its profile and staff record.
    pub async fn register_staff(&self, request: RegisterStaffRequest) -> Result<Profile, AuthCellError> {
        let staff_collection = match request.role {
            Role::Doctor => collections::DOCTORS,
            Role::Receptionist => collections::RECEPTIONISTS,
            other => {
                return Err(AuthCellError::Validation(format!(
                    "{} accounts cannot be registered as staff",
                    other
                )))
            }
        };
        let (name, email) = validate_identity_fields(&request.name, &request.email)?;

        let principal = self.identity.sign_up(&email, &request.password, &name).await?;

        let mut batch = WriteBatch::new();
        batch.set(
            collections::USERS,
            &principal.id,
            json!({
                "name": name,
                "email": email,
                "role": request.role,
                "plan": "Free",
                "created_at": server_timestamp()
            }),
            false,
        )?;
        batch.set(
            staff_collection,
            &principal.id,
            json!({
                "name": name,
                "email": email,
                "specialization": "",
                "experience": "",
                "contact": "",
                "bio": ""
            }),
            true,
        )?;
        self.store.commit(batch).await?;

        info!("Registered {} account {} for {}", request.role, principal.id, email);

        match self.resolver.lookup(&principal.id).await? {
            Some(profile) => Ok(profile),
            None => Ok(Profile::new(&principal.id, &name, &email, request.role)),
        }
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthCellError> {
        self.identity.sign_out(access_token).await?;
        Ok(())
    }
}

fn validate_identity_fields(name: &str, email: &str) -> Result<(String, String), AuthCellError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() {
        return Err(AuthCellError::Validation("Name is required.".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AuthCellError::Validation("A valid email is required.".to_string()));
    }
    Ok((name.to_string(), email.to_lowercase()))
}
