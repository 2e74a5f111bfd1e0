use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDateTime};
use tracing::{debug, info};

use doctor_cell::models::DoctorError;
use doctor_cell::services::doctor::DoctorService;
use patient_cell::models::PatientError;
use patient_cell::services::resolver::{validate_patient_hints, PatientResolver};
use shared_config::AppConfig;
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{AppointmentError, BookingRequest, BookingResult};
use crate::services::conflict::ConflictGuard;

const OVERLAP_MESSAGE: &str =
    "Requested time overlaps an existing appointment. Please choose another slot.";

/// Booking orchestrator: validates the request, resolves the patient,
/// checks the slot and reserves it, in that order. All expected rejections
/// come back inside `BookingResult`; `Err` is reserved for storage failures.
pub struct BookingService {
    doctors: DoctorService,
    patients: PatientResolver,
    guard: ConflictGuard,
    service_token: String,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            doctors: DoctorService::new(config),
            patients: PatientResolver::new(config),
            guard: ConflictGuard::new(config),
            service_token: config.supabase_anon_key.clone(),
            clock,
        }
    }

    pub async fn book(
        &self,
        request: &BookingRequest,
        auth_token: Option<&str>,
    ) -> Result<BookingResult, AppointmentError> {
        if request.doctor_id <= 0 {
            return Ok(BookingResult::rejected("Invalid doctor id."));
        }
        if request.duration_in_minutes <= 0 {
            return Ok(BookingResult::rejected("Duration must be greater than zero."));
        }
        // Patient fields are checked before any lookup so a blank field is
        // reported even when the doctor does not exist.
        if let Err(e) = validate_patient_hints(&request.patient) {
            return Ok(BookingResult::rejected(e.to_string()));
        }

        let raw_start = request.start_time.trim();
        if raw_start.is_empty() {
            return Ok(BookingResult::rejected("StartTime is required."));
        }
        let start = match parse_start_time(raw_start) {
            Ok(start) => start,
            Err(message) => return Ok(BookingResult::rejected(message)),
        };
        if start <= self.clock.now_local() {
            return Ok(BookingResult::rejected(
                "Selected appointment time must be in the future.",
            ));
        }

        debug!(
            "Booking request: doctor {} at {}",
            request.doctor_id, raw_start
        );

        match self.doctors.get_doctor(request.doctor_id).await {
            Ok(_) => {}
            Err(DoctorError::NotFound) => {
                return Ok(BookingResult::rejected("Doctor not found."));
            }
            Err(e) => return Err(AppointmentError::DatabaseError(e.to_string())),
        }

        let token = auth_token.unwrap_or(&self.service_token);
        let patient = match self.patients.resolve(&request.patient, token).await {
            Ok(patient) => patient,
            Err(PatientError::ValidationError(message)) => {
                return Ok(BookingResult::rejected(message));
            }
            Err(e) => return Err(AppointmentError::DatabaseError(e.to_string())),
        };

        // Advisory pre-check gives a clean rejection on the common path; the
        // reserve call re-checks inside the database transaction.
        let end = start + Duration::minutes(request.duration_in_minutes as i64);
        let taken = self
            .guard
            .has_overlap(request.doctor_id, start, end, None, Some(token))
            .await?;
        if taken {
            return Ok(BookingResult::rejected(OVERLAP_MESSAGE));
        }

        match self
            .guard
            .reserve(
                request.doctor_id,
                patient.id,
                start,
                request.duration_in_minutes,
                Some(token),
            )
            .await
        {
            Ok(appointment_id) => {
                info!(
                    "Appointment {} booked: doctor {}, patient {}",
                    appointment_id, request.doctor_id, patient.id
                );
                Ok(BookingResult::booked(appointment_id))
            }
            Err(AppointmentError::ConflictDetected) => Ok(BookingResult::rejected(OVERLAP_MESSAGE)),
            Err(e) => Err(e),
        }
    }
}

/// Accepts RFC 3339 with an offset (normalized to server-local time) or a
/// naive local datetime.
pub fn parse_start_time(raw: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }

    Err(
        "Invalid StartTime format. Use ISO format like 2025-11-26T09:00:00Z or a valid local datetime."
            .to_string(),
    )
}
