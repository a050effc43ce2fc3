use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use auth_cell::services::SessionContext;
use shared_database::AppState;
use shared_models::error::AppError;
use shared_models::PatientRecord;

use crate::models::{PatientSearchQuery, RegisterPatientRequest, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<Json<PatientRecord>, AppError> {
    let patient = PatientService::new(&state)
        .register_patient(request, &session.principal.id)
        .await?;

    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRecord>, AppError> {
    let patient = PatientService::new(&state).get_patient(&patient_id).await?;
    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<PatientRecord>, AppError> {
    let patient = PatientService::new(&state).update_patient(&patient_id, request).await?;
    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);
    let patients = match query.q.as_deref() {
        Some(q) => service.search_patients(q).await?,
        None => service.list_patients().await?,
    };

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_own_record(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<PatientRecord>, AppError> {
    let record = PatientService::new(&state).resolve_own_record(&session.profile).await?;
    Ok(Json(record))
}
