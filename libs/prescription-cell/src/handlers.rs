use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use auth_cell::services::SessionContext;
use patient_cell::services::PatientService;
use shared_config::offset_from_minutes;
use shared_database::AppState;
use shared_models::error::AppError;
use shared_models::Role;

use crate::models::{CreatePrescriptionRequest, ExportQuery, Prescription};
use crate::services::export::{PAGE_HEIGHT, PAGE_WIDTH};
use crate::services::{PrescriptionDocument, PrescriptionService, RecordingCanvas};

/// Doctors see what they issued, patients what was issued to them.
async fn ensure_visible(state: &AppState, session: &SessionContext, prescription: &Prescription) -> Result<(), AppError> {
    let visible = match session.role() {
        Role::Doctor => prescription.doctor_id == session.profile.id,
        Role::Patient => {
            let record = PatientService::new(state).resolve_own_record(&session.profile).await?;
            prescription.patient_id == record.id
        }
        Role::Admin => true,
        Role::Receptionist => false,
    };

    if visible {
        Ok(())
    } else {
        Err(AppError::NotFound("Prescription not found".to_string()))
    }
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Json<Prescription>, AppError> {
    let prescription = PrescriptionService::new(&state)
        .create_prescription(&session.profile, request)
        .await?;

    Ok(Json(prescription))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&state);
    let prescriptions = match session.role() {
        Role::Patient => {
            let record = PatientService::new(&state).resolve_own_record(&session.profile).await?;
            service.list_for_patient(&record.id).await?
        }
        Role::Admin => service.list_all().await?,
        _ => service.list_for_doctor(&session.profile.id).await?,
    };

    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(prescription_id): Path<String>,
) -> Result<Json<Prescription>, AppError> {
    let prescription = PrescriptionService::new(&state).get_prescription(&prescription_id).await?;
    ensure_visible(&state, &session, &prescription).await?;
    Ok(Json(prescription))
}

/// Renders the prescription and returns the recorded pages for replay.
#[axum::debug_handler]
pub async fn export_prescription(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(prescription_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&state);
    let prescription = service.get_prescription(&prescription_id).await?;
    ensure_visible(&state, &session, &prescription).await?;

    let patient_name = match service.patient_name(&prescription.patient_id).await? {
        Some(name) => Some(name),
        None => prescription.patient_name.clone().filter(|name| !name.trim().is_empty()),
    };
    let doctor_name = match service.doctor_name(&prescription.doctor_id).await? {
        Some(name) => Some(name),
        None => prescription.doctor_name.clone().filter(|name| !name.trim().is_empty()),
    };

    let offset = query
        .tz_offset_minutes
        .map(offset_from_minutes)
        .unwrap_or_else(|| state.config.clinic_offset());

    let document = PrescriptionDocument {
        clinic_name: &state.config.clinic_name,
        prescription: &prescription,
        patient_name: patient_name.as_deref(),
        doctor_name: doctor_name.as_deref(),
        generated_at: Utc::now().with_timezone(&offset),
    };

    let mut canvas = RecordingCanvas::new();
    document.render(&mut canvas);

    Ok(Json(json!({
        "file_name": document.file_name(),
        "page_width": PAGE_WIDTH,
        "page_height": PAGE_HEIGHT,
        "pages": canvas.pages
    })))
}
