use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::Profile;

/// Extended profile of a doctor or receptionist, keyed by principal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub experience: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub bio: String,
}

impl StaffRecord {
    /// Stand-in built from the base profile when no staff record exists yet.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            specialization: String::new(),
            experience: String::new(),
            contact: String::new(),
            bio: String::new(),
        }
    }

    pub fn specialization_label(&self) -> &str {
        non_blank(&self.specialization).unwrap_or("General Practitioner")
    }

    pub fn experience_label(&self) -> String {
        format!("{} Years", non_blank(&self.experience).unwrap_or("0"))
    }

    pub fn contact_label(&self) -> &str {
        non_blank(&self.contact).unwrap_or("—")
    }

    pub fn bio_label(&self) -> &str {
        non_blank(&self.bio).unwrap_or("No biography provided.")
    }
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Experience is typed in a free-form box; older records store numbers.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStaffRequest {
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub experience: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Only doctors and receptionists have staff profiles")]
    NotStaff,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::ValidationError(msg) => AppError::ValidationError(msg),
            StaffError::NotStaff => AppError::BadRequest(err.to_string()),
            StaffError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_labels_fall_back_for_blank_fields() {
        let record: StaffRecord = serde_json::from_value(json!({ "id": "d1", "name": "Grey", "experience": 12 })).unwrap();

        assert_eq!(record.experience, "12");
        assert_eq!(record.experience_label(), "12 Years");
        assert_eq!(record.specialization_label(), "General Practitioner");
        assert_eq!(record.contact_label(), "—");
        assert_eq!(record.bio_label(), "No biography provided.");
    }
}
