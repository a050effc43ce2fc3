use chrono::{DateTime, Utc};

use appointment_cell::models::Appointment;
use prescription_cell::models::Prescription;

use crate::models::{Perspective, TimelineEvent, TimelineKind};

const DOCTOR_PLACEHOLDER: &str = "Doctor";

fn doctor_name<'a>(perspective: Perspective<'a>, doctor_id: &str, stored: Option<&'a str>) -> &'a str {
    let directory = match perspective {
        Perspective::Patient { doctor_names } => doctor_names.get(doctor_id).map(String::as_str),
        Perspective::Doctor => None,
    };

    directory
        .or(stored)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DOCTOR_PLACEHOLDER)
}

fn appointment_event(appointment: &Appointment, perspective: &Perspective<'_>) -> TimelineEvent {
    let title = match perspective {
        Perspective::Doctor => format!("Appointment — {}", appointment.status),
        Perspective::Patient { .. } => format!(
            "Appointment with Dr. {} — {}",
            doctor_name(*perspective, &appointment.doctor_id, appointment.doctor_name.as_deref()),
            appointment.status
        ),
    };

    let detail = match appointment.reason.trim() {
        "" => "General visit".to_string(),
        reason => reason.to_string(),
    };

    TimelineEvent {
        kind: TimelineKind::Appointment,
        source_id: appointment.id.clone(),
        instant: appointment.date,
        title,
        detail,
    }
}

fn prescription_event(prescription: &Prescription, perspective: &Perspective<'_>) -> TimelineEvent {
    let title = match perspective {
        Perspective::Doctor => "Prescription".to_string(),
        Perspective::Patient { .. } => format!(
            "Prescription by Dr. {}",
            doctor_name(*perspective, &prescription.doctor_id, prescription.doctor_name.as_deref())
        ),
    };

    let detail = match prescription.medicine_summary() {
        summary if summary.is_empty() => "No medicines listed".to_string(),
        summary => summary,
    };

    TimelineEvent {
        kind: TimelineKind::Prescription,
        source_id: prescription.id.clone(),
        // Not yet stamped by the store: sorts last.
        instant: prescription.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        title,
        detail,
    }
}

/// One reverse-chronological trail for a patient. Ties keep appointments
/// ahead of prescriptions and otherwise preserve input order.
pub fn build_timeline(
    patient_id: &str,
    appointments: &[Appointment],
    prescriptions: &[Prescription],
    perspective: Perspective<'_>,
) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = appointments
        .iter()
        .filter(|appointment| appointment.patient_id == patient_id)
        .map(|appointment| appointment_event(appointment, &perspective))
        .chain(
            prescriptions
                .iter()
                .filter(|prescription| prescription.patient_id == patient_id)
                .map(|prescription| prescription_event(prescription, &perspective)),
        )
        .collect();

    events.sort_by(|a, b| b.instant.cmp(&a.instant));
    events
}
