use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};
use futures::TryFutureExt;
use tracing::debug;

use appointment_cell::models::Appointment;
use appointment_cell::services::{stats as appointment_stats, AppointmentBookingService};
use doctor_cell::services::StaffService;
use patient_cell::services::PatientService;
use prescription_cell::services::PrescriptionService;
use shared_database::AppState;
use shared_models::{PatientRecord, Profile, Role};

use crate::models::{
    AppointmentEntry, DashboardError, DoctorDashboard, PatientDashboard, PatientTimeline, Perspective,
    ReceptionistDashboard,
};
use crate::services::stats;
use crate::services::timeline::build_timeline;

/// Directory entries whose id appears among the appointments' patients.
pub fn my_patients(directory: &[PatientRecord], appointments: &[Appointment]) -> Vec<PatientRecord> {
    let seen: HashSet<&str> = appointments.iter().map(|a| a.patient_id.as_str()).collect();
    directory
        .iter()
        .filter(|patient| seen.contains(patient.id.as_str()))
        .cloned()
        .collect()
}

pub fn doctor_names(doctors: &[Profile]) -> HashMap<String, String> {
    doctors
        .iter()
        .map(|doctor| (doctor.id.clone(), doctor.name.clone()))
        .collect()
}

/// Loads the per-role slices behind each dashboard. Loads inside one view
/// run concurrently; nothing is cached between calls.
pub struct EntityAggregator {
    appointments: AppointmentBookingService,
    prescriptions: PrescriptionService,
    patients: PatientService,
    staff: StaffService,
}

impl EntityAggregator {
    pub fn new(state: &AppState) -> Self {
        Self {
            appointments: AppointmentBookingService::new(state),
            prescriptions: PrescriptionService::new(state),
            patients: PatientService::new(state),
            staff: StaffService::new(state),
        }
    }

    pub async fn doctor_view(
        &self,
        profile: &Profile,
        now: DateTime<FixedOffset>,
    ) -> Result<DoctorDashboard, DashboardError> {
        let (appointments, prescriptions, patients) = futures::try_join!(
            self.appointments.list_for_doctor(&profile.id).map_err(DashboardError::from),
            self.prescriptions.list_for_doctor(&profile.id).map_err(DashboardError::from),
            self.patients.list_patients().map_err(DashboardError::from),
        )?;

        let mine = my_patients(&patients, &appointments);
        let summary = stats::doctor_summary(&appointments, &mine, &prescriptions, &now);
        let todays_schedule = appointment_stats::appointments_on(&appointments, now.date_naive(), &now.timezone());

        debug!(
            "Doctor dashboard for {}: {} appointments, {} of {} patients",
            profile.id,
            appointments.len(),
            mine.len(),
            patients.len()
        );

        Ok(DoctorDashboard {
            profile: profile.clone(),
            summary,
            appointments: AppointmentEntry::list_for_role(appointments, Role::Doctor),
            todays_schedule: AppointmentEntry::list_for_role(todays_schedule, Role::Doctor),
            prescriptions,
            my_patients: mine,
            patients,
        })
    }

    pub async fn patient_view(
        &self,
        profile: &Profile,
        now: DateTime<FixedOffset>,
    ) -> Result<PatientDashboard, DashboardError> {
        let record = self.patients.resolve_own_record(profile).await?;

        let (appointments, prescriptions, doctors) = futures::try_join!(
            self.appointments.list_for_patient(&record.id).map_err(DashboardError::from),
            self.prescriptions.list_for_patient(&record.id).map_err(DashboardError::from),
            self.staff.list_doctors().map_err(DashboardError::from),
        )?;

        let names = doctor_names(&doctors);
        let timeline = build_timeline(
            &record.id,
            &appointments,
            &prescriptions,
            Perspective::Patient { doctor_names: &names },
        );
        let summary = stats::patient_summary(&appointments, &prescriptions, &now);

        Ok(PatientDashboard {
            profile: profile.clone(),
            record,
            summary,
            appointments: AppointmentEntry::list_for_role(appointments, Role::Patient),
            prescriptions,
            doctors,
            timeline,
        })
    }

    pub async fn receptionist_view(
        &self,
        profile: &Profile,
        now: DateTime<FixedOffset>,
    ) -> Result<ReceptionistDashboard, DashboardError> {
        let (patients, appointments, doctors) = futures::try_join!(
            self.patients.list_patients().map_err(DashboardError::from),
            self.appointments.list_all().map_err(DashboardError::from),
            self.staff.list_doctors().map_err(DashboardError::from),
        )?;

        let role = profile.role();
        let summary = stats::receptionist_summary(&patients, &appointments, &now);
        let todays_schedule = appointment_stats::appointments_on(&appointments, now.date_naive(), &now.timezone());

        Ok(ReceptionistDashboard {
            profile: profile.clone(),
            summary,
            patients,
            appointments: AppointmentEntry::list_for_role(appointments, role),
            todays_schedule: AppointmentEntry::list_for_role(todays_schedule, role),
            doctors,
        })
    }

    /// A patient's trail as seen by `viewer`. Doctors see only their own
    /// entries; admins see everything. Unknown patients get a placeholder.
    pub async fn patient_timeline(&self, viewer: &Profile, patient_id: &str) -> Result<PatientTimeline, DashboardError> {
        let patient = async {
            match self.patients.get_patient(patient_id).await {
                Ok(record) => Ok(record),
                Err(patient_cell::models::PatientError::NotFound) => {
                    debug!("Timeline for unknown patient {}", patient_id);
                    Ok(PatientRecord::placeholder(patient_id, "Patient", ""))
                }
                Err(e) => Err(DashboardError::from(e)),
            }
        };

        if viewer.role() == Role::Doctor {
            let (patient, appointments, prescriptions) = futures::try_join!(
                patient,
                self.appointments.list_for_doctor(&viewer.id).map_err(DashboardError::from),
                self.prescriptions.list_for_doctor(&viewer.id).map_err(DashboardError::from),
            )?;
            let events = build_timeline(&patient.id, &appointments, &prescriptions, Perspective::Doctor);
            return Ok(PatientTimeline { patient, events });
        }

        let (patient, appointments, prescriptions, doctors) = futures::try_join!(
            patient,
            self.appointments.list_for_patient(patient_id).map_err(DashboardError::from),
            self.prescriptions.list_for_patient(patient_id).map_err(DashboardError::from),
            self.staff.list_doctors().map_err(DashboardError::from),
        )?;
        let names = doctor_names(&doctors);
        let events = build_timeline(
            &patient.id,
            &appointments,
            &prescriptions,
            Perspective::Patient { doctor_names: &names },
        );
        Ok(PatientTimeline { patient, events })
    }
}
