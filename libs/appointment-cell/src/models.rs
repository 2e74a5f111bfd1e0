use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use patient_cell::models::PatientHints;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
}

impl Appointment {
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub doctor_id: i64,
    /// Raw client string; parsed and normalized to server-local time.
    pub start_time: String,
    pub duration_in_minutes: i32,
    pub patient: PatientHints,
}

/// Outcome of a booking attempt. Expected rejections (validation, overlap,
/// unknown doctor) come back as `success: false` rather than an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<i64>,
}

impl BookingResult {
    pub fn booked(appointment_id: i64) -> Self {
        Self {
            success: true,
            message: "Appointment booked".to_string(),
            appointment_id: Some(appointment_id),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            appointment_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub start_time: String,
    pub duration_in_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQueryParameters {
    pub page: Option<i32>,
    pub page_size: Option<i32>,
    pub doctor_id: Option<i64>,
    pub patient_name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

/// Closed set of sort columns; anything unrecognized falls back to start
/// time so client typos never leak into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    StartTime,
    Doctor,
    Patient,
}

impl SortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("doctor") => SortKey::Doctor,
            Some("patient") => SortKey::Patient,
            _ => SortKey::StartTime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("desc") => SortDir::Desc,
            _ => SortDir::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DoctorRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PatientRef {
    pub name: String,
    #[serde(default)]
    pub file_no: String,
}

/// Row shape returned by the listing query with embedded doctor and patient.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AppointmentRow {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub doctor: DoctorRef,
    pub patient: PatientRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListItem {
    pub id: i64,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_file_no: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: i32,
}

impl From<AppointmentRow> for AppointmentListItem {
    fn from(row: AppointmentRow) -> Self {
        let end_time = row.start_time + Duration::minutes(row.duration_minutes as i64);
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            doctor_name: row.doctor.name,
            patient_id: row.patient_id,
            patient_name: row.patient.name,
            patient_file_no: row.patient.file_no,
            start_time: row.start_time,
            end_time,
            duration_minutes: row.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Requested time overlaps an existing appointment. Please choose another slot.")]
    ConflictDetected,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::{SortDir, SortKey};

    #[test]
    fn sort_key_parses_known_values_case_insensitively() {
        assert_eq!(SortKey::parse(Some("doctor")), SortKey::Doctor);
        assert_eq!(SortKey::parse(Some("PATIENT")), SortKey::Patient);
        assert_eq!(SortKey::parse(Some("startTime")), SortKey::StartTime);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_start_time() {
        assert_eq!(SortKey::parse(Some("id; drop table")), SortKey::StartTime);
        assert_eq!(SortKey::parse(None), SortKey::StartTime);
    }

    #[test]
    fn sort_dir_defaults_to_ascending() {
        assert_eq!(SortDir::parse(Some("desc")), SortDir::Desc);
        assert_eq!(SortDir::parse(Some("DESC")), SortDir::Desc);
        assert_eq!(SortDir::parse(Some("sideways")), SortDir::Asc);
        assert_eq!(SortDir::parse(None), SortDir::Asc);
    }
}
