use std::cmp::Reverse;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::store::{collections, server_timestamp, Document, DocumentStore, Filter, WriteBatch};
use shared_database::AppState;
use shared_models::{PatientRecord, Profile};

use crate::models::{CreatePrescriptionRequest, Medicine, Prescription, PrescriptionError, RiskLevel};

pub struct PrescriptionService {
    store: Arc<dyn DocumentStore>,
}

impl PrescriptionService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(state.store.clone())
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Issues a prescription. Blank medicine rows are dropped; a non-empty
    /// diagnosis also writes a diagnosis log in the same batch.
    pub async fn create_prescription(
        &self,
        doctor: &Profile,
        request: CreatePrescriptionRequest,
    ) -> Result<Prescription, PrescriptionError> {
        let patient_id = request.patient_id.trim().to_string();
        if patient_id.is_empty() {
            return Err(PrescriptionError::ValidationError("Please select a patient.".to_string()));
        }

        let medicines: Vec<Medicine> = request
            .medicines
            .into_iter()
            .filter(|medicine| !medicine.is_blank())
            .map(|medicine| Medicine::new(medicine.name.trim(), medicine.dosage.trim(), medicine.instruction.trim()))
            .collect();
        if medicines.is_empty() {
            return Err(PrescriptionError::ValidationError("Add at least one medicine.".to_string()));
        }

        let diagnosis = request.diagnosis.trim().to_string();
        let patient_name = self.patient_name(&patient_id).await?.unwrap_or_default();

        let prescription_id = Uuid::new_v4().to_string();
        let mut batch = WriteBatch::new();
        batch.set(
            collections::PRESCRIPTIONS,
            &prescription_id,
            json!({
                "patient_id": patient_id,
                "patient_name": patient_name,
                "doctor_id": doctor.id,
                "doctor_name": doctor.name,
                "diagnosis": diagnosis,
                "medicines": medicines,
                "notes": request.notes.trim(),
                "created_at": server_timestamp()
            }),
            false,
        )?;

        if !diagnosis.is_empty() {
            batch.set(
                collections::DIAGNOSIS_LOGS,
                &Uuid::new_v4().to_string(),
                json!({
                    "patient_id": patient_id,
                    "doctor_id": doctor.id,
                    "symptoms": diagnosis,
                    "ai_response": "",
                    "risk_level": RiskLevel::Low,
                    "created_at": server_timestamp()
                }),
                false,
            )?;
        }

        self.store.commit(batch).await?;
        info!("Prescription {} issued by {} for patient {}", prescription_id, doctor.id, patient_id);

        self.get_prescription(&prescription_id).await
    }

    pub async fn get_prescription(&self, prescription_id: &str) -> Result<Prescription, PrescriptionError> {
        let doc = self
            .store
            .get(collections::PRESCRIPTIONS, prescription_id)
            .await?
            .ok_or(PrescriptionError::NotFound)?;
        Ok(doc.decode()?)
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Prescription>, PrescriptionError> {
        self.list(Filter::eq("doctor_id", doctor_id)).await
    }

    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Prescription>, PrescriptionError> {
        self.list(Filter::eq("patient_id", patient_id)).await
    }

    pub async fn list_all(&self) -> Result<Vec<Prescription>, PrescriptionError> {
        self.list(Filter::all()).await
    }

    /// Newest first; prescriptions without a creation time go last.
    async fn list(&self, filter: Filter) -> Result<Vec<Prescription>, PrescriptionError> {
        let docs = self.store.query(collections::PRESCRIPTIONS, &filter).await?;
        let mut prescriptions = decode_all(&docs);
        prescriptions.sort_by_key(|prescription| Reverse(prescription.created_at));
        debug!("Loaded {} prescriptions", prescriptions.len());
        Ok(prescriptions)
    }

    pub async fn patient_name(&self, patient_id: &str) -> Result<Option<String>, PrescriptionError> {
        let name = match self.store.get(collections::PATIENTS, patient_id).await? {
            Some(doc) => Some(doc.decode::<PatientRecord>()?.name),
            None => None,
        };
        Ok(name.filter(|name| !name.trim().is_empty()))
    }

    pub async fn doctor_name(&self, doctor_id: &str) -> Result<Option<String>, PrescriptionError> {
        let name = match self.store.get(collections::USERS, doctor_id).await? {
            Some(doc) => Some(doc.decode::<Profile>()?.name),
            None => None,
        };
        Ok(name.filter(|name| !name.trim().is_empty()))
    }
}

pub fn decode_all(docs: &[Document]) -> Vec<Prescription> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<Prescription>() {
            Ok(prescription) => Some(prescription),
            Err(e) => {
                warn!("Skipping malformed prescription: {}", e);
                None
            }
        })
        .collect()
}
