use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==============================================================================
// CORE DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: String,
}

/// PUT replaces both fields; partial edits are not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorQueryParameters {
    pub page: Option<i32>,
    pub page_size: Option<i32>,
    pub search: Option<String>,
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTimesQuery {
    pub date: String,
    pub slot_minutes: Option<i32>,
    pub work_start: Option<String>,
    pub work_end: Option<String>,
}

/// One bookable slot: full timestamp plus the wall-clock label shown in the
/// booking UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub iso: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTimesResponse {
    pub doctor_id: i64,
    pub date: String,
    pub slot_minutes: i32,
    pub work_start: String,
    pub work_end: String,
    pub available_slots: Vec<AvailableSlot>,
}

/// Booked interval as read back from the appointments table; only the fields
/// the slot subtraction needs.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedInterval {
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
}

impl BookedInterval {
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found.")]
    NotFound,

    #[error("A doctor with this name already exists.")]
    DuplicateName,

    #[error("Doctor has appointments. Remove appointments first.")]
    HasAppointments,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
