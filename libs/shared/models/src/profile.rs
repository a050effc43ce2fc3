use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::instant;
use crate::role::Role;

/// Role-bearing application record derived from a principal. Stored in the
/// `users` collection keyed by the principal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(alias = "uid")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Older records may lack a role; those are treated as patients.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "default_plan", alias = "subscriptionPlan", alias = "subscription_plan")]
    pub plan: String,
    #[serde(default, with = "instant::optional", alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn default_plan() -> String {
    "Free".to_string()
}

impl Profile {
    pub fn new(id: &str, name: &str, email: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role: Some(role),
            plan: default_plan(),
            created_at: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role.unwrap_or(Role::Patient)
    }

    /// Name with a placeholder for records that never had one.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User"
        } else {
            &self.name
        }
    }
}
