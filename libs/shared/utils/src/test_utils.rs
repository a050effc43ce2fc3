use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_database::{AppState, MemoryIdentity, MemoryStore};
use shared_models::auth::Principal;
use shared_models::role::Role;

use crate::jwt::sign_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub session_ready_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            session_ready_timeout_secs: 2,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            session_ready_timeout_secs: self.session_ready_timeout_secs,
            store_backend: StoreBackend::Memory,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A principal plus the profile role it should be seeded with.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(email: &str, name: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "Dr. Grey", Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "Pat Ient", Role::Patient)
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, "Rita Desk", Role::Receptionist)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "Ada Admin", Role::Admin)
    }

    pub fn to_principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            display_name: Some(self.name.clone()),
            created_at: Some(Utc::now()),
        }
    }

    /// Fields of the matching `users` document.
    pub fn profile_fields(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "role": self.role.to_string(),
            "plan": "Free",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    /// Writes the profile document into the store.
    pub async fn seed(&self, store: &MemoryStore) {
        store
            .insert("users", &self.id, self.profile_fields())
            .await
            .expect("seeding a profile into the memory store");
    }

    pub fn bearer(&self, secret: &str) -> String {
        format!("Bearer {}", JwtTestUtils::create_test_token(self, secret, Some(24)))
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        sign_token(&user.to_principal(), secret, Duration::hours(exp_hours.unwrap_or(24)))
            .expect("HMAC can take key of any size")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Memory-backed application state with direct handles to its backends.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
    pub config: TestConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(config: TestConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let secret = config.jwt_secret.clone();
        let identity = Arc::new(MemoryIdentity::with_token_issuer(Arc::new(move |principal: &Principal| {
            sign_token(principal, &secret, Duration::hours(1)).unwrap_or_default()
        })));
        let state = AppState::new(config.to_arc(), store.clone(), identity.clone());

        Self { state, store, identity, config }
    }

    /// Seeds the profile and returns the bearer header value for it.
    pub async fn sign_in_as(&self, user: &TestUser) -> String {
        user.seed(&self.store).await;
        user.bearer(&self.config.jwt_secret)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MockDocuments;

impl MockDocuments {
    pub fn patient(name: &str, email: &str, user_id: Option<&str>) -> Value {
        json!({
            "name": name,
            "age": 34,
            "gender": "Female",
            "contact": "555-0100",
            "email": email,
            "user_id": user_id.unwrap_or(""),
            "created_by": "reception-1",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment(patient_id: &str, doctor_id: &str, date: &str, status: &str) -> Value {
        json!({
            "patient_id": patient_id,
            "patient_name": "Pat Ient",
            "doctor_id": doctor_id,
            "doctor_name": "Dr. Grey",
            "date": date,
            "reason": "Checkup",
            "status": status,
            "created_by": patient_id,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn prescription(patient_id: &str, doctor_id: &str, created_at: &str) -> Value {
        json!({
            "patient_id": patient_id,
            "patient_name": "Pat Ient",
            "doctor_id": doctor_id,
            "doctor_name": "Dr. Grey",
            "medicines": [
                { "name": "Amoxicillin", "dosage": "500mg", "instruction": "Twice daily" }
            ],
            "notes": "Rest and fluids",
            "created_at": created_at
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.store_backend, StoreBackend::Memory);
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::doctor("doc@example.com");
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(validate_token(&token, secret).unwrap().id, user.id);
        assert!(validate_token(&JwtTestUtils::create_expired_token(&user, secret), secret).is_err());
    }

    #[tokio::test]
    async fn test_seeded_profile_is_readable() {
        use shared_database::DocumentStore;

        let app = TestApp::new();
        let user = TestUser::receptionist("desk@example.com");
        app.sign_in_as(&user).await;

        let doc = app.store.get("users", &user.id).await.unwrap().unwrap();
        assert_eq!(doc.get("role"), Some(&json!("Receptionist")));
    }
}
