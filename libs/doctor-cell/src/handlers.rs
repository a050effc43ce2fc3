use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use auth_cell::services::SessionContext;
use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{StaffRecord, UpdateStaffRequest};
use crate::services::StaffService;

fn staff_payload(record: &StaffRecord) -> Value {
    json!({
        "record": record,
        "display": {
            "specialization": record.specialization_label(),
            "experience": record.experience_label(),
            "contact": record.contact_label(),
            "bio": record.bio_label()
        }
    })
}

#[axum::debug_handler]
pub async fn get_own_staff_record(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Value>, AppError> {
    let record = StaffService::new(&state).get_staff_record(&session.profile).await?;
    Ok(Json(staff_payload(&record)))
}

#[axum::debug_handler]
pub async fn update_own_staff_record(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<UpdateStaffRequest>,
) -> Result<Json<Value>, AppError> {
    let record = StaffService::new(&state)
        .update_staff_record(&session.profile, request)
        .await?;
    Ok(Json(staff_payload(&record)))
}

#[axum::debug_handler]
pub async fn list_doctors(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let doctors = StaffService::new(&state).list_doctors().await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}
