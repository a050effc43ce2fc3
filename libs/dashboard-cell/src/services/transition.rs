use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::services::AppointmentBookingService;
use patient_cell::services::PatientService;
use shared_database::AppState;
use shared_models::{Profile, Role};

use crate::models::{AppointmentBoard, AppointmentEntry, DashboardError, TransitionOutcome};
use crate::services::stats::appointment_stats;

/// Writes status changes and rebuilds the caller's appointment board from
/// fresh data afterwards.
pub struct StatusTransitionManager {
    appointments: AppointmentBookingService,
    patients: PatientService,
}

impl StatusTransitionManager {
    pub fn new(state: &AppState) -> Self {
        Self {
            appointments: AppointmentBookingService::new(state),
            patients: PatientService::new(state),
        }
    }

    /// The appointments `profile` works with, and their counters.
    pub async fn load_board(
        &self,
        profile: &Profile,
        now: DateTime<FixedOffset>,
    ) -> Result<AppointmentBoard, DashboardError> {
        let role = profile.role();
        let appointments: Vec<Appointment> = match role {
            Role::Doctor => self.appointments.list_for_doctor(&profile.id).await?,
            Role::Receptionist | Role::Admin => self.appointments.list_all().await?,
            Role::Patient => {
                let record = self.patients.resolve_own_record(profile).await?;
                self.appointments.list_for_patient(&record.id).await?
            }
        };

        let stats = appointment_stats(&appointments, &now);
        Ok(AppointmentBoard {
            appointments: AppointmentEntry::list_for_role(appointments, role),
            stats,
        })
    }

    pub async fn transition(
        &self,
        profile: &Profile,
        appointment_id: &str,
        new_status: AppointmentStatus,
        now: DateTime<FixedOffset>,
    ) -> Result<TransitionOutcome, DashboardError> {
        let role = profile.role();
        let appointment = self
            .appointments
            .transition_status(appointment_id, new_status, profile)
            .await?;

        info!("{} {} set appointment {} to {}", role, profile.id, appointment_id, new_status);

        let board = self.load_board(profile, now).await?;
        Ok(TransitionOutcome {
            appointment: AppointmentEntry::for_role(appointment, role),
            board,
        })
    }

    /// Runs a transition against a board the caller already holds. The
    /// board is replaced only when both the write and the reload succeed.
    pub async fn apply(
        &self,
        profile: &Profile,
        board: &mut AppointmentBoard,
        appointment_id: &str,
        new_status: AppointmentStatus,
        now: DateTime<FixedOffset>,
    ) -> Result<AppointmentEntry, DashboardError> {
        match self.transition(profile, appointment_id, new_status, now).await {
            Ok(outcome) => {
                *board = outcome.board;
                Ok(outcome.appointment)
            }
            Err(e) => {
                warn!("Status change for appointment {} failed: {}", appointment_id, e);
                Err(e)
            }
        }
    }
}
