use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::instant;

/// A patient as registered at the clinic. The record can predate the
/// patient's own account, in which case `user_id` is empty until the first
/// sign-in binds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "userId", deserialize_with = "blank_as_none")]
    pub user_id: Option<String>,
    #[serde(default, alias = "createdBy")]
    pub created_by: String,
    #[serde(default, with = "instant::optional", alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PatientRecord {
    /// Record used when a signed-in patient has no stored record at all.
    pub fn placeholder(id: &str, name: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age: None,
            gender: String::new(),
            contact: String::new(),
            email: email.to_string(),
            user_id: Some(id.to_string()),
            created_by: String::new(),
            created_at: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.user_id.is_some()
    }

    /// Case-insensitive match against name or contact.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.contact.to_lowercase().contains(&query)
    }
}

/// Accepts numbers, numeric strings and blanks.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_u64().map(|age| age as u32),
        Some(Value::String(raw)) => raw.trim().parse().ok(),
        _ => None,
    })
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|raw| !raw.trim().is_empty()))
}
