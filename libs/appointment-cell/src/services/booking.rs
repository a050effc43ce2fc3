use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use shared_database::store::{collections, server_timestamp, Document, DocumentStore, Filter};
use shared_database::AppState;
use shared_models::{PatientRecord, Profile, Role};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, ReceptionBookingRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::stats;

pub const DEFAULT_REASON: &str = "General Visit";

/// Reads a booking date in the clinic's local time. Explicit offsets win;
/// a bare date without a time means local midnight.
pub fn parse_booking_instant(
    date: &str,
    time: Option<&str>,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, AppointmentError> {
    let date = date.trim();
    let invalid = || AppointmentError::ValidationError(format!("Invalid appointment date: {}", date));

    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(time) => {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
            let clock = NaiveTime::parse_from_str(time, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
                .map_err(|_| AppointmentError::ValidationError(format!("Invalid appointment time: {}", time)))?;
            day.and_time(clock)
        }
        None => NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| {
                NaiveDate::parse_from_str(date, "%Y-%m-%d").map(|day| day.and_time(NaiveTime::MIN))
            })
            .map_err(|_| invalid())?,
    };

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}

pub struct AppointmentBookingService {
    store: Arc<dyn DocumentStore>,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(state.store.clone())
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// A patient booking for themselves. The record comes from the caller's
    /// resolved session so the appointment is keyed by the record id.
    pub async fn book_for_patient(
        &self,
        patient: &PatientRecord,
        request: BookAppointmentRequest,
        created_by: &str,
        offset: FixedOffset,
    ) -> Result<Appointment, AppointmentError> {
        let doctor_id = request.doctor_id.trim();
        if doctor_id.is_empty() || request.date.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Please select a doctor and date.".to_string(),
            ));
        }

        let date = parse_booking_instant(&request.date, request.time.as_deref(), offset)?;
        let reason = match request.reason.trim() {
            "" => DEFAULT_REASON.to_string(),
            reason => reason.to_string(),
        };
        let doctor_name = self.doctor_name(doctor_id).await?;

        self.insert(
            &patient.id,
            Some(patient.name.clone()).filter(|name| !name.trim().is_empty()),
            doctor_id,
            doctor_name,
            date,
            reason,
            created_by,
        )
        .await
    }

    /// A front-desk booking on behalf of an existing patient.
    pub async fn book_at_reception(
        &self,
        request: ReceptionBookingRequest,
        created_by: &str,
        offset: FixedOffset,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = request.patient_id.trim();
        let doctor_id = request.doctor_id.trim();
        if patient_id.is_empty() || doctor_id.is_empty() || request.date.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Please select patient, doctor, and date.".to_string(),
            ));
        }

        let date = parse_booking_instant(&request.date, None, offset)?;

        let patient_name = match self.store.get(collections::PATIENTS, patient_id).await? {
            Some(doc) => doc.decode::<PatientRecord>()?.name,
            None => {
                warn!("Booking for unknown patient {}", patient_id);
                String::new()
            }
        };
        let doctor_name = self.doctor_name(doctor_id).await?;

        self.insert(
            patient_id,
            Some(patient_name).filter(|name| !name.trim().is_empty()),
            doctor_id,
            doctor_name,
            date,
            request.reason.trim().to_string(),
            created_by,
        )
        .await
    }

    async fn doctor_name(&self, doctor_id: &str) -> Result<Option<String>, AppointmentError> {
        let name = match self.store.get(collections::USERS, doctor_id).await? {
            Some(doc) => Some(doc.decode::<Profile>()?.name),
            None => None,
        };
        Ok(name.filter(|name| !name.trim().is_empty()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert(
        &self,
        patient_id: &str,
        patient_name: Option<String>,
        doctor_id: &str,
        doctor_name: Option<String>,
        date: DateTime<Utc>,
        reason: String,
        created_by: &str,
    ) -> Result<Appointment, AppointmentError> {
        let id = self
            .store
            .add(
                collections::APPOINTMENTS,
                json!({
                    "patient_id": patient_id,
                    "patient_name": patient_name.clone().unwrap_or_default(),
                    "doctor_id": doctor_id,
                    "doctor_name": doctor_name.clone().unwrap_or_default(),
                    "date": date.to_rfc3339(),
                    "reason": reason,
                    "status": AppointmentStatus::Pending,
                    "created_by": created_by,
                    "created_at": server_timestamp()
                }),
            )
            .await?;

        info!("Appointment {} booked for patient {} with doctor {}", id, patient_id, doctor_id);
        self.get_appointment(&id).await
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        let doc = self
            .store
            .get(collections::APPOINTMENTS, appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;
        Ok(doc.decode()?)
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.list(Filter::eq("doctor_id", doctor_id)).await
    }

    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.list(Filter::eq("patient_id", patient_id)).await
    }

    pub async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.list(Filter::all()).await
    }

    /// Newest first. Documents that fail to decode are skipped.
    async fn list(&self, filter: Filter) -> Result<Vec<Appointment>, AppointmentError> {
        let docs = self.store.query(collections::APPOINTMENTS, &filter).await?;
        let mut appointments = decode_all(&docs);
        stats::sort_newest_first(&mut appointments);
        debug!("Loaded {} appointments", appointments.len());
        Ok(appointments)
    }

    /// Reads the current status, checks ownership, legality and role policy,
    /// then writes. Doctors only reach their own appointments.
    pub async fn transition_status(
        &self,
        appointment_id: &str,
        new_status: AppointmentStatus,
        actor: &Profile,
    ) -> Result<Appointment, AppointmentError> {
        let role = actor.role();
        let current = self.get_appointment(appointment_id).await?;
        if role == Role::Doctor && current.doctor_id != actor.id {
            warn!("Doctor {} tried to change appointment {} of {}", actor.id, appointment_id, current.doctor_id);
            return Err(AppointmentError::NotFound);
        }
        self.lifecycle.authorize_transition(&current.status, &new_status, role)?;

        self.store
            .update(collections::APPOINTMENTS, appointment_id, json!({ "status": new_status }))
            .await?;

        info!(
            "Appointment {} moved from {} to {} by {} {}",
            appointment_id, current.status, new_status, role, actor.id
        );

        Ok(Appointment { status: new_status, ..current })
    }
}

pub fn decode_all(docs: &[Document]) -> Vec<Appointment> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<Appointment>() {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                warn!("Skipping malformed appointment: {}", e);
                None
            }
        })
        .collect()
}
