//! Role summaries built from the appointment counters.

use chrono::{DateTime, TimeZone};

use appointment_cell::models::Appointment;
use appointment_cell::services::stats::{count_pending, count_this_month, count_today, next_upcoming};
use prescription_cell::models::Prescription;
use shared_models::PatientRecord;

use crate::models::{AppointmentStats, DoctorSummary, PatientSummary, ReceptionistSummary};

pub fn appointment_stats<Tz: TimeZone>(appointments: &[Appointment], now: &DateTime<Tz>) -> AppointmentStats {
    AppointmentStats {
        today: count_today(appointments, now),
        this_month: count_this_month(appointments, now),
        pending: count_pending(appointments),
        next_upcoming: next_upcoming(appointments, now).cloned(),
    }
}

pub fn doctor_summary<Tz: TimeZone>(
    appointments: &[Appointment],
    my_patients: &[PatientRecord],
    prescriptions: &[Prescription],
    now: &DateTime<Tz>,
) -> DoctorSummary {
    DoctorSummary {
        today: count_today(appointments, now),
        this_month: count_this_month(appointments, now),
        patients: my_patients.len(),
        prescriptions: prescriptions.len(),
    }
}

pub fn patient_summary<Tz: TimeZone>(
    appointments: &[Appointment],
    prescriptions: &[Prescription],
    now: &DateTime<Tz>,
) -> PatientSummary {
    PatientSummary {
        appointments: appointments.len(),
        prescriptions: prescriptions.len(),
        next_upcoming: next_upcoming(appointments, now).cloned(),
    }
}

pub fn receptionist_summary<Tz: TimeZone>(
    patients: &[PatientRecord],
    appointments: &[Appointment],
    now: &DateTime<Tz>,
) -> ReceptionistSummary {
    ReceptionistSummary {
        patients: patients.len(),
        today: count_today(appointments, now),
        pending: count_pending(appointments),
    }
}
