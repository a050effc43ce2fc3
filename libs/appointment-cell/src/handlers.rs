use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{FixedOffset, NaiveDate};
use serde_json::{json, Value};

use auth_cell::services::SessionContext;
use patient_cell::services::PatientService;
use shared_config::offset_from_minutes;
use shared_database::AppState;
use shared_models::error::AppError;
use shared_models::Role;

use crate::models::{
    Appointment, AppointmentListQuery, BookAppointmentRequest, ReceptionBookingRequest, UpdateStatusRequest,
};
use crate::services::{stats, AppointmentBookingService, AppointmentLifecycleService};

fn viewer_offset(state: &AppState, query: &AppointmentListQuery) -> FixedOffset {
    query
        .tz_offset_minutes
        .map(offset_from_minutes)
        .unwrap_or_else(|| state.config.clinic_offset())
}

/// Appointment payload with the transitions offered to `role`.
pub fn appointment_view(appointment: &Appointment, role: Role) -> Value {
    let actions = AppointmentLifecycleService::new().allowed_actions(&appointment.status, role);
    let mut view = json!(appointment);
    view["allowed_actions"] = json!(actions);
    view
}

/// Appointments the session may see: doctors theirs, patients their own,
/// front desk and admins everything.
async fn scoped_appointments(state: &AppState, session: &SessionContext) -> Result<Vec<Appointment>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointments = match session.role() {
        Role::Doctor => service.list_for_doctor(&session.profile.id).await?,
        Role::Patient => {
            let record = PatientService::new(state).resolve_own_record(&session.profile).await?;
            service.list_for_patient(&record.id).await?
        }
        Role::Receptionist | Role::Admin => service.list_all().await?,
    };
    Ok(appointments)
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let record = PatientService::new(&state).resolve_own_record(&session.profile).await?;
    let appointment = AppointmentBookingService::new(&state)
        .book_for_patient(&record, request, &session.principal.id, state.config.clinic_offset())
        .await?;

    Ok(Json(appointment_view(&appointment, session.role())))
}

#[axum::debug_handler]
pub async fn book_at_reception(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<ReceptionBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state)
        .book_at_reception(request, &session.principal.id, state.config.clinic_offset())
        .await?;

    Ok(Json(appointment_view(&appointment, session.role())))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let mut appointments = scoped_appointments(&state, &session).await?;

    if let Some(raw) = query.date.as_deref().filter(|raw| !raw.trim().is_empty()) {
        let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("Invalid date filter: {}", raw)))?;
        appointments = stats::appointments_on(&appointments, day, &viewer_offset(&state, &query));
    }

    if let Some(status) = query.status {
        appointments.retain(|appointment| appointment.status == status);
    }

    let role = session.role();
    let views: Vec<Value> = appointments.iter().map(|a| appointment_view(a, role)).collect();

    Ok(Json(json!({
        "appointments": views,
        "total": views.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state)
        .get_appointment(&appointment_id)
        .await?;

    let visible = match session.role() {
        Role::Doctor => appointment.doctor_id == session.profile.id,
        Role::Patient => {
            let record = PatientService::new(&state).resolve_own_record(&session.profile).await?;
            appointment.patient_id == record.id
        }
        Role::Receptionist | Role::Admin => true,
    };
    if !visible {
        return Err(AppError::NotFound("Appointment not found".to_string()));
    }

    Ok(Json(appointment_view(&appointment, session.role())))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state)
        .transition_status(&appointment_id, request.status, &session.profile)
        .await?;

    Ok(Json(appointment_view(&appointment, session.role())))
}
