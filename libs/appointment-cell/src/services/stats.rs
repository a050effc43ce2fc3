//! Counters and orderings over a loaded slice of appointments.
//!
//! Every function takes the caller's "now" in the caller's time zone, so
//! "today" and "this month" follow the viewer's calendar.

use std::cmp::Reverse;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::models::{Appointment, AppointmentStatus};

fn local_date<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

pub fn count_today<Tz: TimeZone>(appointments: &[Appointment], now: &DateTime<Tz>) -> usize {
    let today = now.date_naive();
    let tz = now.timezone();
    appointments
        .iter()
        .filter(|appointment| local_date(&appointment.date, &tz) == today)
        .count()
}

/// Appointments on or after the first day of the current local month.
pub fn count_this_month<Tz: TimeZone>(appointments: &[Appointment], now: &DateTime<Tz>) -> usize {
    let today = now.date_naive();
    let first_of_month = today.with_day(1).unwrap_or(today);
    let tz = now.timezone();
    appointments
        .iter()
        .filter(|appointment| local_date(&appointment.date, &tz) >= first_of_month)
        .count()
}

pub fn count_pending(appointments: &[Appointment]) -> usize {
    appointments
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::Pending)
        .count()
}

/// Earliest appointment at or after `now` that has not been cancelled.
pub fn next_upcoming<'a, Tz: TimeZone>(
    appointments: &'a [Appointment],
    now: &DateTime<Tz>,
) -> Option<&'a Appointment> {
    let now = now.with_timezone(&Utc);
    appointments
        .iter()
        .filter(|appointment| appointment.date >= now && appointment.status != AppointmentStatus::Cancelled)
        .min_by_key(|appointment| appointment.date)
}

/// The schedule for one local day, earliest first.
pub fn appointments_on<Tz: TimeZone>(appointments: &[Appointment], day: NaiveDate, tz: &Tz) -> Vec<Appointment> {
    let mut schedule: Vec<Appointment> = appointments
        .iter()
        .filter(|appointment| local_date(&appointment.date, tz) == day)
        .cloned()
        .collect();
    schedule.sort_by_key(|appointment| appointment.date);
    schedule
}

pub fn sort_newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|appointment| Reverse(appointment.date));
}
