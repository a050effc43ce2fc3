use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};

use auth_cell::services::{SessionContext, SessionGate};
use shared_config::offset_from_minutes;
use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{
    DashboardQuery, DoctorDashboard, PatientDashboard, PatientTimeline, ReceptionistDashboard,
    StatusChangeRequest, TransitionOutcome,
};
use crate::services::{EntityAggregator, StatusTransitionManager};

fn viewer_now(state: &AppState, query: &DashboardQuery) -> DateTime<FixedOffset> {
    let offset = query
        .tz_offset_minutes
        .map(offset_from_minutes)
        .unwrap_or_else(|| state.config.clinic_offset());
    Utc::now().with_timezone(&offset)
}

/// Dashboard loaders start only once the session is ready.
async fn ready_session(state: &AppState, gate: &SessionGate) -> Result<SessionContext, AppError> {
    gate.wait(state.config.session_ready_timeout()).await
}

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<AppState>,
    Extension(gate): Extension<SessionGate>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DoctorDashboard>, AppError> {
    let session = ready_session(&state, &gate).await?;
    let dashboard = EntityAggregator::new(&state)
        .doctor_view(&session.profile, viewer_now(&state, &query))
        .await?;
    Ok(Json(dashboard))
}

#[axum::debug_handler]
pub async fn patient_dashboard(
    State(state): State<AppState>,
    Extension(gate): Extension<SessionGate>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<PatientDashboard>, AppError> {
    let session = ready_session(&state, &gate).await?;
    let dashboard = EntityAggregator::new(&state)
        .patient_view(&session.profile, viewer_now(&state, &query))
        .await?;
    Ok(Json(dashboard))
}

#[axum::debug_handler]
pub async fn receptionist_dashboard(
    State(state): State<AppState>,
    Extension(gate): Extension<SessionGate>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ReceptionistDashboard>, AppError> {
    let session = ready_session(&state, &gate).await?;
    let dashboard = EntityAggregator::new(&state)
        .receptionist_view(&session.profile, viewer_now(&state, &query))
        .await?;
    Ok(Json(dashboard))
}

#[axum::debug_handler]
pub async fn patient_timeline(
    State(state): State<AppState>,
    Extension(gate): Extension<SessionGate>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientTimeline>, AppError> {
    let session = ready_session(&state, &gate).await?;
    let timeline = EntityAggregator::new(&state)
        .patient_timeline(&session.profile, &patient_id)
        .await?;
    Ok(Json(timeline))
}

#[axum::debug_handler]
pub async fn change_status(
    State(state): State<AppState>,
    Extension(gate): Extension<SessionGate>,
    Path(appointment_id): Path<String>,
    Query(query): Query<DashboardQuery>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let session = ready_session(&state, &gate).await?;
    let outcome = StatusTransitionManager::new(&state)
        .transition(&session.profile, &appointment_id, request.status, viewer_now(&state, &query))
        .await?;
    Ok(Json(outcome))
}
