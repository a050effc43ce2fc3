use std::sync::Arc;

use tracing::{info, warn};

use shared_database::{AppState, IdentityProvider};
use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_models::Role;

use crate::services::resolver::IdentityResolver;
use crate::services::session::SessionContext;

/// An empty allow-list admits every role.
pub fn is_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.is_empty() || allowed.contains(&role)
}

/// Gates a dashboard on the caller's resolved role. Any refusal signs the
/// session out so the client never holds a half-authorized session.
pub struct AuthorizationGuard {
    resolver: IdentityResolver,
    identity: Arc<dyn IdentityProvider>,
}

impl AuthorizationGuard {
    pub fn new(state: &AppState) -> Self {
        Self {
            resolver: IdentityResolver::new(state),
            identity: state.identity.clone(),
        }
    }

    pub async fn authorize(
        &self,
        principal: Principal,
        access_token: &str,
        allowed: &[Role],
    ) -> Result<SessionContext, AppError> {
        let profile = match self.resolver.resolve(&principal).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("Could not resolve profile for {}: {}", principal.id, err);
                self.terminate(access_token).await;
                return Err(AppError::SessionTerminated(
                    "Your session could not be verified. Please sign in again.".to_string(),
                ));
            }
        };

        let role = profile.role();
        if !is_allowed(role, allowed) {
            info!("Denying {} ({}) access; allowed roles: {:?}", principal.id, role, allowed);
            self.terminate(access_token).await;
            return Err(AppError::AccessDenied(format!(
                "{} accounts cannot access this dashboard",
                role
            )));
        }

        Ok(SessionContext {
            principal,
            profile,
            access_token: access_token.to_string(),
        })
    }

    async fn terminate(&self, access_token: &str) {
        if let Err(err) = self.identity.sign_out(access_token).await {
            warn!("Sign-out after refusal failed: {}", err);
        }
    }
}
