use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use shared_database::store::{collections, server_timestamp, DocumentStore, Filter, WriteBatch};
use shared_database::AppState;
use shared_models::auth::Principal;
use shared_models::{PatientRecord, Profile, Role};

use crate::models::AuthCellError;

pub const DEFAULT_PATIENT_NAME: &str = "New Patient";

/// Turns an authenticated principal into its role-bearing profile, creating
/// the profile (and for new patients a record) on first contact.
pub struct IdentityResolver {
    store: Arc<dyn DocumentStore>,
}

impl IdentityResolver {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(state.store.clone())
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Reads the stored profile without provisioning anything.
    pub async fn lookup(&self, principal_id: &str) -> Result<Option<Profile>, AuthCellError> {
        match self.store.get(collections::USERS, principal_id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    pub async fn resolve(&self, principal: &Principal) -> Result<Profile, AuthCellError> {
        if let Some(profile) = self.lookup(&principal.id).await? {
            debug!("Resolved existing profile {} as {}", profile.id, profile.role());
            return Ok(profile);
        }

        info!("No profile for principal {}, provisioning a patient", principal.id);

        let email = principal
            .email
            .as_deref()
            .map(|email| email.trim().to_lowercase())
            .unwrap_or_default();
        let linked = if email.is_empty() {
            None
        } else {
            self.find_existing_record(&email).await?
        };

        let name = match &linked {
            Some(record) if !record.name.trim().is_empty() => record.name.clone(),
            _ => principal
                .display_name
                .clone()
                .unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string()),
        };

        let mut batch = WriteBatch::new();
        match &linked {
            Some(record) => {
                batch.update(collections::PATIENTS, &record.id, json!({ "user_id": principal.id }))?;
            }
            None => {
                batch.set(
                    collections::PATIENTS,
                    &principal.id,
                    json!({
                        "name": name,
                        "age": "",
                        "gender": "",
                        "contact": "",
                        "email": email,
                        "user_id": principal.id,
                        "created_by": principal.id,
                        "created_at": server_timestamp()
                    }),
                    true,
                )?;
            }
        }

        let profile = Profile::new(&principal.id, &name, &email, Role::Patient);
        batch.set(
            collections::USERS,
            &principal.id,
            json!({
                "name": profile.name,
                "email": profile.email,
                "role": Role::Patient,
                "plan": profile.plan,
                "created_at": server_timestamp()
            }),
            false,
        )?;

        self.store.commit(batch).await?;

        if let Some(record) = &linked {
            info!("Linked patient record {} to principal {}", record.id, principal.id);
        }

        Ok(self.lookup(&principal.id).await?.unwrap_or(profile))
    }

    /// Finds a receptionist-created record carrying the (lowercased) email.
    async fn find_existing_record(&self, email: &str) -> Result<Option<PatientRecord>, AuthCellError> {
        let matches = self
            .store
            .query(collections::PATIENTS, &Filter::eq("email", email).limit(2))
            .await?;

        let Some(first) = matches.first() else {
            return Ok(None);
        };

        if matches.len() > 1 {
            let ids: Vec<&str> = matches.iter().map(|doc| doc.id.as_str()).collect();
            warn!("Several patient records share {}: {:?}; linking {}", email, ids, first.id);
        }

        Ok(Some(first.decode()?))
    }
}
