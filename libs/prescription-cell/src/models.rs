use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::instant;

// ==============================================================================
// CORE PRESCRIPTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default, alias = "instructions")]
    pub instruction: String,
}

impl Medicine {
    pub fn new(name: &str, dosage: &str, instruction: &str) -> Self {
        Self {
            name: name.to_string(),
            dosage: dosage.to_string(),
            instruction: instruction.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Issued by a doctor; never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    #[serde(alias = "patientId")]
    pub patient_id: String,
    #[serde(default, alias = "patientName")]
    pub patient_name: Option<String>,
    #[serde(alias = "doctorId")]
    pub doctor_id: String,
    #[serde(default, alias = "doctorName")]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, with = "instant::optional", alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Prescription {
    /// Medicine names joined for one-line summaries.
    pub fn medicine_summary(&self) -> String {
        self.medicines
            .iter()
            .map(|medicine| medicine.name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Companion record written alongside a prescription with a diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisLog {
    pub id: String,
    #[serde(alias = "patientId")]
    pub patient_id: String,
    #[serde(alias = "doctorId")]
    pub doctor_id: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default, alias = "aiResponse")]
    pub ai_response: String,
    #[serde(default, alias = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(default, with = "instant::optional", alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportQuery {
    pub tz_offset_minutes: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PrescriptionError {
    #[error("Prescription not found")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PrescriptionError> for AppError {
    fn from(err: PrescriptionError) -> Self {
        match err {
            PrescriptionError::NotFound => AppError::NotFound(err.to_string()),
            PrescriptionError::ValidationError(msg) => AppError::ValidationError(msg),
            PrescriptionError::Store(e) => e.into(),
        }
    }
}
