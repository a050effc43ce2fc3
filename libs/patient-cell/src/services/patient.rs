use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use shared_database::store::{collections, server_timestamp, DocumentStore, Filter, WriteBatch};
use shared_database::{AppState, IdentityProvider};
use shared_models::{PatientRecord, Profile, Role};

use crate::models::{PatientError, RegisterPatientRequest, UpdatePatientRequest};

pub struct PatientService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

fn age_value(age: Option<u32>) -> Value {
    age.map(Value::from).unwrap_or_else(|| json!(""))
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            identity: state.identity.clone(),
        }
    }

    /// Registers a patient on behalf of `created_by`. When both email and
    /// password are given an account is created and the record is keyed by it.
    pub async fn register_patient(
        &self,
        request: RegisterPatientRequest,
        created_by: &str,
    ) -> Result<PatientRecord, PatientError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(PatientError::ValidationError("Patient name is required.".to_string()));
        }

        let email = request.email.trim().to_lowercase();
        let password = request.password.filter(|password| !password.is_empty());

        let user_id = match (&password, email.is_empty()) {
            (Some(password), false) => {
                let principal = self.identity.sign_up(&email, password, &name).await?;
                Some(principal.id)
            }
            _ => None,
        };

        let fields = json!({
            "name": name,
            "age": age_value(request.age),
            "gender": request.gender.trim(),
            "contact": request.contact.trim(),
            "email": email,
            "user_id": user_id.clone().unwrap_or_default(),
            "created_by": created_by,
            "created_at": server_timestamp()
        });

        let id = match &user_id {
            Some(uid) => {
                let mut batch = WriteBatch::new();
                batch.set(collections::PATIENTS, uid, fields, false)?;
                batch.set(
                    collections::USERS,
                    uid,
                    json!({
                        "name": name,
                        "email": email,
                        "role": Role::Patient,
                        "plan": "Free",
                        "created_at": server_timestamp()
                    }),
                    false,
                )?;
                self.store.commit(batch).await?;
                uid.clone()
            }
            None => self.store.add(collections::PATIENTS, fields).await?,
        };

        info!("Patient {} registered by {} (account: {})", id, created_by, user_id.is_some());
        self.get_patient(&id).await
    }

    pub async fn get_patient(&self, patient_id: &str) -> Result<PatientRecord, PatientError> {
        let doc = self
            .store
            .get(collections::PATIENTS, patient_id)
            .await?
            .ok_or(PatientError::NotFound)?;
        Ok(doc.decode()?)
    }

    /// Edits the demographic fields. Email and account binding never change here.
    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
    ) -> Result<PatientRecord, PatientError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(PatientError::ValidationError("Name is required.".to_string()));
        }

        self.store
            .update(
                collections::PATIENTS,
                patient_id,
                json!({
                    "name": name,
                    "age": age_value(request.age),
                    "gender": request.gender.trim(),
                    "contact": request.contact.trim()
                }),
            )
            .await?;

        debug!("Patient {} updated", patient_id);
        self.get_patient(patient_id).await
    }

    /// Full directory, newest registrations first.
    pub async fn list_patients(&self) -> Result<Vec<PatientRecord>, PatientError> {
        let mut patients: Vec<PatientRecord> = self
            .store
            .query(collections::PATIENTS, &Filter::all())
            .await?
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<_, _>>()?;

        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(patients)
    }

    pub async fn search_patients(&self, query: &str) -> Result<Vec<PatientRecord>, PatientError> {
        Ok(self
            .list_patients()
            .await?
            .into_iter()
            .filter(|patient| patient.matches(query))
            .collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<PatientRecord>, PatientError> {
        self.find_first(Filter::eq("email", email.trim().to_lowercase()).limit(1)).await
    }

    pub async fn find_by_user_id(&self, user_id: &str) -> Result<Option<PatientRecord>, PatientError> {
        self.find_first(Filter::eq("user_id", user_id).limit(1)).await
    }

    async fn find_first(&self, filter: Filter) -> Result<Option<PatientRecord>, PatientError> {
        let docs = self.store.query(collections::PATIENTS, &filter).await?;
        match docs.first() {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// A patient's own record: keyed by their id, else bound through
    /// `user_id`, else a placeholder built from the profile.
    pub async fn resolve_own_record(&self, profile: &Profile) -> Result<PatientRecord, PatientError> {
        if let Some(doc) = self.store.get(collections::PATIENTS, &profile.id).await? {
            return Ok(doc.decode()?);
        }

        if let Some(record) = self.find_by_user_id(&profile.id).await? {
            return Ok(record);
        }

        debug!("No patient record for {}, using profile placeholder", profile.id);
        Ok(PatientRecord::placeholder(&profile.id, &profile.name, &profile.email))
    }
}
