use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::AppointmentError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Guards the one-appointment-per-doctor-per-interval rule.
///
/// The overlap probe is advisory: the authoritative check runs inside the
/// `book_appointment_slot` / `move_appointment_slot` database functions,
/// which re-test overlap in the same transaction as the insert. A losing
/// racer surfaces as a 409 from the storage layer.
pub struct ConflictGuard {
    supabase: SupabaseClient,
}

impl ConflictGuard {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// True when any appointment for the doctor intersects [start, end).
    /// Half-open on both sides: back-to-back appointments do not collide.
    pub async fn has_overlap(
        &self,
        doctor_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_id: Option<i64>,
        auth_token: Option<&str>,
    ) -> Result<bool, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=lt.{}&end_time=gt.{}&select=id&limit=1",
            doctor_id,
            end.format(TIMESTAMP_FORMAT),
            start.format(TIMESTAMP_FORMAT)
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(!existing.is_empty())
    }

    /// Atomically re-checks the slot and inserts the appointment, returning
    /// the new appointment id. A concurrent winner turns into
    /// `ConflictDetected`.
    pub async fn reserve(
        &self,
        doctor_id: i64,
        patient_id: i64,
        start: NaiveDateTime,
        duration_minutes: i32,
        auth_token: Option<&str>,
    ) -> Result<i64, AppointmentError> {
        debug!(
            "Reserving slot: doctor {} at {}",
            doctor_id,
            start.format(TIMESTAMP_FORMAT)
        );

        let args = json!({
            "p_doctor_id": doctor_id,
            "p_patient_id": patient_id,
            "p_start_time": start.format(TIMESTAMP_FORMAT).to_string(),
            "p_duration_minutes": duration_minutes,
        });

        self.supabase
            .rpc("book_appointment_slot", auth_token, args)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    warn!("Slot taken by a concurrent booking: doctor {}", doctor_id);
                    AppointmentError::ConflictDetected
                } else {
                    AppointmentError::DatabaseError(e.to_string())
                }
            })
    }

    /// Moves an existing appointment to a new slot under the same in-database
    /// overlap re-check used by `reserve`.
    pub async fn move_appointment(
        &self,
        appointment_id: i64,
        new_start: NaiveDateTime,
        new_duration_minutes: Option<i32>,
        auth_token: Option<&str>,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Moving appointment {} to {}",
            appointment_id,
            new_start.format(TIMESTAMP_FORMAT)
        );

        let args = json!({
            "p_appointment_id": appointment_id,
            "p_start_time": new_start.format(TIMESTAMP_FORMAT).to_string(),
            "p_duration_minutes": new_duration_minutes,
        });

        let _: Value = self
            .supabase
            .rpc("move_appointment_slot", auth_token, args)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    AppointmentError::ConflictDetected
                } else {
                    AppointmentError::DatabaseError(e.to_string())
                }
            })?;

        Ok(())
    }
}
