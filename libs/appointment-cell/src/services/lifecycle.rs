use tracing::{debug, warn};

use shared_models::Role;

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {:?} to {:?}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn is_terminal(&self, status: &AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }

    /// Statuses a role may set by hand, regardless of the current state.
    pub fn role_targets(&self, role: Role) -> &'static [AppointmentStatus] {
        match role {
            Role::Doctor => &[AppointmentStatus::Completed],
            Role::Receptionist => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            Role::Admin => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            Role::Patient => &[],
        }
    }

    /// Transitions offered to `role` for an appointment in `status`.
    pub fn allowed_actions(&self, status: &AppointmentStatus, role: Role) -> Vec<AppointmentStatus> {
        let targets = self.role_targets(role);
        self.get_valid_transitions(status)
            .into_iter()
            .filter(|next| targets.contains(next))
            .collect()
    }

    /// Legality first, then role policy.
    pub fn authorize_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
        role: Role,
    ) -> Result<(), AppointmentError> {
        self.validate_status_transition(current_status, new_status)?;

        if !self.role_targets(role).contains(new_status) {
            return Err(AppointmentError::NotPermitted { role, status: *new_status });
        }

        Ok(())
    }
}
