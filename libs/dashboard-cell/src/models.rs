use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use appointment_cell::models::{Appointment, AppointmentError, AppointmentStatus};
use appointment_cell::services::AppointmentLifecycleService;
use doctor_cell::models::StaffError;
use patient_cell::models::PatientError;
use prescription_cell::models::{Prescription, PrescriptionError};
use shared_models::error::AppError;
use shared_models::{PatientRecord, Profile, Role};

// ==============================================================================
// TIMELINE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    Appointment,
    Prescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TimelineKind,
    pub source_id: String,
    pub instant: DateTime<Utc>,
    pub title: String,
    pub detail: String,
}

/// Who is reading the timeline. Patients see which doctor each entry is
/// from; doctors only ever see their own entries.
#[derive(Debug, Clone, Copy)]
pub enum Perspective<'a> {
    Doctor,
    Patient { doctor_names: &'a HashMap<String, String> },
}

// ==============================================================================
// DASHBOARD VIEWS
// ==============================================================================

/// An appointment with the transitions the viewer may trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub allowed_actions: Vec<AppointmentStatus>,
}

impl AppointmentEntry {
    pub fn for_role(appointment: Appointment, role: Role) -> Self {
        let allowed_actions = AppointmentLifecycleService::new().allowed_actions(&appointment.status, role);
        Self { appointment, allowed_actions }
    }

    pub fn list_for_role(appointments: Vec<Appointment>, role: Role) -> Vec<Self> {
        appointments.into_iter().map(|a| Self::for_role(a, role)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DoctorSummary {
    pub today: usize,
    pub this_month: usize,
    pub patients: usize,
    pub prescriptions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientSummary {
    pub appointments: usize,
    pub prescriptions: usize,
    pub next_upcoming: Option<Appointment>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceptionistSummary {
    pub patients: usize,
    pub today: usize,
    pub pending: usize,
}

/// Counters re-derived after every status change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentStats {
    pub today: usize,
    pub this_month: usize,
    pub pending: usize,
    pub next_upcoming: Option<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub profile: Profile,
    pub summary: DoctorSummary,
    pub appointments: Vec<AppointmentEntry>,
    pub todays_schedule: Vec<AppointmentEntry>,
    pub prescriptions: Vec<Prescription>,
    /// Directory entries with at least one appointment with this doctor.
    pub my_patients: Vec<PatientRecord>,
    pub patients: Vec<PatientRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub profile: Profile,
    pub record: PatientRecord,
    pub summary: PatientSummary,
    pub appointments: Vec<AppointmentEntry>,
    pub prescriptions: Vec<Prescription>,
    pub doctors: Vec<Profile>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceptionistDashboard {
    pub profile: Profile,
    pub summary: ReceptionistSummary,
    pub patients: Vec<PatientRecord>,
    pub appointments: Vec<AppointmentEntry>,
    pub todays_schedule: Vec<AppointmentEntry>,
    pub doctors: Vec<Profile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientTimeline {
    pub patient: PatientRecord,
    pub events: Vec<TimelineEvent>,
}

/// The role's appointment slice with its derived counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentBoard {
    pub appointments: Vec<AppointmentEntry>,
    pub stats: AppointmentStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub appointment: AppointmentEntry,
    pub board: AppointmentBoard,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub tz_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Prescription(#[from] PrescriptionError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Staff(#[from] StaffError),
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Appointment(e) => e.into(),
            DashboardError::Prescription(e) => e.into(),
            DashboardError::Patient(e) => e.into(),
            DashboardError::Staff(e) => e.into(),
        }
    }
}
