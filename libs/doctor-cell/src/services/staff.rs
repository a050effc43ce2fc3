use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use shared_database::store::{collections, DocumentStore, Filter, WriteBatch};
use shared_database::AppState;
use shared_models::{Profile, Role};

use crate::models::{StaffError, StaffRecord, UpdateStaffRequest};

pub struct StaffService {
    store: Arc<dyn DocumentStore>,
}

fn staff_collection(role: Role) -> Result<&'static str, StaffError> {
    match role {
        Role::Doctor => Ok(collections::DOCTORS),
        Role::Receptionist => Ok(collections::RECEPTIONISTS),
        _ => Err(StaffError::NotStaff),
    }
}

impl StaffService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Staff record for the profile, or one derived from the profile itself.
    pub async fn get_staff_record(&self, profile: &Profile) -> Result<StaffRecord, StaffError> {
        let collection = staff_collection(profile.role())?;

        match self.store.get(collection, &profile.id).await? {
            Some(doc) => Ok(doc.decode()?),
            None => {
                debug!("No {} record for {}, falling back to profile", collection, profile.id);
                Ok(StaffRecord::from_profile(profile))
            }
        }
    }

    /// Saves the staff record and renames the profile in one batch.
    pub async fn update_staff_record(
        &self,
        profile: &Profile,
        request: UpdateStaffRequest,
    ) -> Result<StaffRecord, StaffError> {
        let collection = staff_collection(profile.role())?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(StaffError::ValidationError("Name is required.".to_string()));
        }

        let mut batch = WriteBatch::new();
        batch.set(
            collection,
            &profile.id,
            json!({
                "name": name,
                "specialization": request.specialization.trim(),
                "experience": request.experience.trim(),
                "contact": request.contact.trim(),
                "bio": request.bio.trim()
            }),
            true,
        )?;
        batch.update(collections::USERS, &profile.id, json!({ "name": name }))?;
        self.store.commit(batch).await?;

        info!("Staff profile {} updated", profile.id);

        let mut record = self.get_staff_record(profile).await?;
        if record.email.is_empty() {
            record.email = profile.email.clone();
        }
        Ok(record)
    }

    /// Profiles whose role is Doctor, by name.
    pub async fn list_doctors(&self) -> Result<Vec<Profile>, StaffError> {
        let docs = self
            .store
            .query(collections::USERS, &Filter::eq("role", Role::Doctor.to_string()))
            .await?;

        let mut doctors: Vec<Profile> = docs.iter().map(|doc| doc.decode()).collect::<Result<_, _>>()?;
        doctors.sort_by_key(|doctor| doctor.name.to_lowercase());
        Ok(doctors)
    }
}
