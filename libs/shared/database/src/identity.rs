use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthSession, Principal};
use shared_models::error::AppError;
use shared_models::instant::parse_instant;

use crate::supabase::SupabaseClient;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentityError {
    #[error("No account exists for this email")]
    UserNotFound,

    #[error("Invalid email or password")]
    WrongPassword,

    #[error("Too many attempts")]
    TooManyRequests,

    #[error("Email already registered")]
    EmailInUse,

    #[error("Password too weak")]
    WeakPassword,

    #[error("Identity provider error: {0}")]
    Other(String),
}

impl IdentityError {
    /// Message suitable for showing to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            IdentityError::UserNotFound | IdentityError::WrongPassword => {
                "Invalid email or password.".to_string()
            }
            IdentityError::TooManyRequests => "Too many attempts. Try again later.".to_string(),
            IdentityError::EmailInUse => "Email already registered.".to_string(),
            IdentityError::WeakPassword => {
                format!("Password must be at least {} characters.", MIN_PASSWORD_LENGTH)
            }
            IdentityError::Other(msg) => msg.clone(),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailInUse => AppError::Conflict(err.user_message()),
            IdentityError::WeakPassword => AppError::ValidationError(err.user_message()),
            IdentityError::Other(msg) => AppError::ExternalService(msg),
            _ => AppError::Auth(err.user_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Principal),
    SignedOut { principal_id: Option<String> },
}

/// External identity provider contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, IdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;

    fn on_auth_change(&self) -> broadcast::Receiver<AuthEvent>;
}

// ==============================================================================
// SUPABASE GOTRUE
// ==============================================================================

pub struct SupabaseIdentity {
    supabase: SupabaseClient,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseIdentity {
    pub fn new(config: &AppConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            supabase: SupabaseClient::new(config),
            events,
        }
    }

    fn principal_from_user(user: &Value) -> Result<Principal, IdentityError> {
        let id = user
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| IdentityError::Other("Identity response without user id".to_string()))?;

        Ok(Principal {
            id: id.to_string(),
            email: user.get("email").and_then(Value::as_str).map(str::to_string),
            display_name: Principal::display_name_from_metadata(user.get("user_metadata")),
            created_at: user.get("created_at").and_then(parse_instant),
        })
    }

    /// Maps GoTrue error payloads onto the provider error taxonomy.
    pub fn classify_error(status: StatusCode, payload: &Value) -> IdentityError {
        let code = payload
            .get("error_code")
            .or_else(|| payload.get("error"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let message = payload
            .get("msg")
            .or_else(|| payload.get("error_description"))
            .or_else(|| payload.get("message"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let lowered = message.to_lowercase();

        if status == StatusCode::TOO_MANY_REQUESTS || code.starts_with("over_") {
            return IdentityError::TooManyRequests;
        }

        match code {
            "user_not_found" => IdentityError::UserNotFound,
            "invalid_credentials" | "invalid_grant" => IdentityError::WrongPassword,
            "user_already_exists" | "email_exists" => IdentityError::EmailInUse,
            "weak_password" => IdentityError::WeakPassword,
            _ if lowered.contains("already registered") => IdentityError::EmailInUse,
            _ if lowered.contains("password should be") => IdentityError::WeakPassword,
            _ if lowered.contains("invalid login credentials") => IdentityError::WrongPassword,
            _ if message.is_empty() => IdentityError::Other(format!("Identity provider returned {}", status)),
            _ => IdentityError::Other(message),
        }
    }

    async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<Value, IdentityError> {
        let (status, payload) = self
            .supabase
            .send(method, path, token, body, None)
            .await
            .map_err(|e| IdentityError::Other(e.to_string()))?;

        if !status.is_success() {
            let err = Self::classify_error(status, &payload);
            warn!("Identity provider rejected {}: {:?}", path, err);
            return Err(err);
        }

        Ok(payload)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        debug!("Signing in {}", email);

        let payload = self
            .call(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;

        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| IdentityError::Other("Sign-in response without access token".to_string()))?
            .to_string();
        let user = payload
            .get("user")
            .ok_or_else(|| IdentityError::Other("Sign-in response without user".to_string()))?;
        let principal = Self::principal_from_user(user)?;

        let _ = self.events.send(AuthEvent::SignedIn(principal.clone()));

        Ok(AuthSession {
            access_token,
            refresh_token: payload.get("refresh_token").and_then(Value::as_str).map(str::to_string),
            expires_in: payload.get("expires_in").and_then(Value::as_u64),
            principal,
        })
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, IdentityError> {
        debug!("Registering identity for {}", email);

        let payload = self
            .call(
                Method::POST,
                "/auth/v1/signup",
                None,
                Some(json!({
                    "email": email,
                    "password": password,
                    "data": { "full_name": display_name }
                })),
            )
            .await?;

        // With auto-confirm on the response is a session; otherwise the bare user.
        let user = payload.get("user").unwrap_or(&payload);
        let principal = Self::principal_from_user(user)?;
        info!("Identity created for {}", principal.id);
        Ok(principal)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.call(Method::POST, "/auth/v1/logout", Some(access_token), None).await?;
        let _ = self.events.send(AuthEvent::SignedOut { principal_id: None });
        Ok(())
    }

    fn on_auth_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// ==============================================================================
// IN-MEMORY PROVIDER
// ==============================================================================

pub type TokenIssuer = Arc<dyn Fn(&Principal) -> String + Send + Sync>;

struct MemoryAccount {
    principal: Principal,
    password: String,
}

#[derive(Default)]
struct MemoryIdentityState {
    accounts: HashMap<String, MemoryAccount>,
    sessions: HashMap<String, String>,
    revoked: Vec<String>,
}

/// Identity provider kept in process memory, used for local runs and tests.
pub struct MemoryIdentity {
    state: RwLock<MemoryIdentityState>,
    issuer: TokenIssuer,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::with_token_issuer(Arc::new(|_| format!("memory-{}", Uuid::new_v4())))
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_issuer(issuer: TokenIssuer) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: RwLock::new(MemoryIdentityState::default()),
            issuer,
            events,
        }
    }

    /// Tokens passed to `sign_out`, oldest first.
    pub async fn revoked_tokens(&self) -> Vec<String> {
        self.state.read().await.revoked.clone()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<Principal> {
        self.state
            .read()
            .await
            .accounts
            .get(&email.to_lowercase())
            .map(|account| account.principal.clone())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get(&email.to_lowercase())
            .ok_or(IdentityError::UserNotFound)?;

        if account.password != password {
            return Err(IdentityError::WrongPassword);
        }

        let principal = account.principal.clone();
        let access_token = (self.issuer)(&principal);
        state.sessions.insert(access_token.clone(), principal.id.clone());
        drop(state);

        let _ = self.events.send(AuthEvent::SignedIn(principal.clone()));

        Ok(AuthSession {
            access_token,
            refresh_token: None,
            expires_in: Some(3600),
            principal,
        })
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword);
        }

        let mut state = self.state.write().await;
        let key = email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(IdentityError::EmailInUse);
        }

        let display_name = Some(display_name.trim()).filter(|name| !name.is_empty());
        let principal = Principal::new(&Uuid::new_v4().to_string(), Some(email), display_name);
        state.accounts.insert(key, MemoryAccount { principal: principal.clone(), password: password.to_string() });
        Ok(principal)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        let principal_id = state.sessions.remove(access_token);
        state.revoked.push(access_token.to_string());
        drop(state);

        let _ = self.events.send(AuthEvent::SignedOut { principal_id });
        Ok(())
    }

    fn on_auth_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_classify_gotrue_errors() {
        let cases = vec![
            (StatusCode::BAD_REQUEST, json!({ "error_code": "invalid_credentials", "msg": "Invalid login credentials" }), IdentityError::WrongPassword),
            (StatusCode::BAD_REQUEST, json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }), IdentityError::WrongPassword),
            (StatusCode::TOO_MANY_REQUESTS, json!({ "msg": "slow down" }), IdentityError::TooManyRequests),
            (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error_code": "user_already_exists" }), IdentityError::EmailInUse),
            (StatusCode::UNPROCESSABLE_ENTITY, json!({ "msg": "Password should be at least 6 characters." }), IdentityError::WeakPassword),
            (StatusCode::BAD_REQUEST, json!({ "error_code": "user_not_found" }), IdentityError::UserNotFound),
        ];

        for (status, payload, expected) in cases {
            assert_eq!(SupabaseIdentity::classify_error(status, &payload), expected, "payload {}", payload);
        }

        assert_matches!(
            SupabaseIdentity::classify_error(StatusCode::INTERNAL_SERVER_ERROR, &json!({})),
            IdentityError::Other(_)
        );
    }

    #[tokio::test]
    async fn test_memory_identity_lifecycle() {
        let identity = MemoryIdentity::new();
        let mut events = identity.on_auth_change();

        assert_eq!(identity.sign_up("a@x.com", "123", "Ann").await, Err(IdentityError::WeakPassword));
        let principal = identity.sign_up("a@x.com", "secret1", "Ann").await.unwrap();
        assert_eq!(identity.sign_up("A@x.com", "secret1", "Ann").await, Err(IdentityError::EmailInUse));

        assert_matches!(identity.sign_in("a@x.com", "wrong!").await, Err(IdentityError::WrongPassword));
        assert_matches!(identity.sign_in("b@x.com", "secret1").await, Err(IdentityError::UserNotFound));

        let session = identity.sign_in("a@x.com", "secret1").await.unwrap();
        assert_eq!(session.principal.id, principal.id);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(principal.clone()));

        identity.sign_out(&session.access_token).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::SignedOut { principal_id: Some(principal.id.clone()) }
        );
        assert_eq!(identity.revoked_tokens().await, vec![session.access_token]);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(IdentityError::WrongPassword.user_message(), "Invalid email or password.");
        assert_eq!(IdentityError::UserNotFound.user_message(), "Invalid email or password.");
        assert_eq!(IdentityError::TooManyRequests.user_message(), "Too many attempts. Try again later.");
        assert_eq!(IdentityError::WeakPassword.user_message(), "Password must be at least 6 characters.");
    }
}
