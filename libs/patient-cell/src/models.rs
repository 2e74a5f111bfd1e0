use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    /// Clinic file number, the natural key. Unique when present.
    #[serde(default)]
    pub file_no: String,
    #[serde(default)]
    pub name: String,
    /// Digits only once normalized.
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: String,
}

/// Identity hints carried by a booking request. Everything arrives as raw
/// client strings; the resolver trims, normalizes and validates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientHints {
    pub name: String,
    pub phone: String,
    pub file_no: Option<String>,
    pub address: String,
    pub date_of_birth: String,
    pub gender: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSearchQuery {
    pub file_no: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
