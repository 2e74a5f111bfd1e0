use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AvailableSlot, AvailableTimesQuery, AvailableTimesResponse, BookedInterval, DoctorError};
use crate::services::doctor::DoctorService;

const DEFAULT_SLOT_MINUTES: i32 = 30;
const DEFAULT_WORK_START: &str = "09:00";
const DEFAULT_WORK_END: &str = "17:00";
const MAX_SLOT_MINUTES: i32 = 240;

pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
        }
    }

    /// Free slots for one doctor on one day: the working window chopped into
    /// fixed-size candidates minus everything already booked. Read-only.
    pub async fn available_times(
        &self,
        doctor_id: i64,
        query: AvailableTimesQuery,
    ) -> Result<AvailableTimesResponse, DoctorError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, query.date);

        let date = NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
            .map_err(|_| DoctorError::ValidationError("Date must be in yyyy-MM-dd format.".to_string()))?;

        self.doctor_service.get_doctor(doctor_id).await?;

        let work_start_raw = query.work_start.as_deref().unwrap_or(DEFAULT_WORK_START);
        let work_end_raw = query.work_end.as_deref().unwrap_or(DEFAULT_WORK_END);

        let work_start = NaiveTime::parse_from_str(work_start_raw, "%H:%M")
            .map_err(|_| DoctorError::ValidationError("workStart must be HH:mm format".to_string()))?;
        let work_end = NaiveTime::parse_from_str(work_end_raw, "%H:%M")
            .map_err(|_| DoctorError::ValidationError("workEnd must be HH:mm format".to_string()))?;

        if work_end <= work_start {
            return Err(DoctorError::ValidationError("workEnd must be > workStart".to_string()));
        }

        let slot_minutes = query.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
        if slot_minutes <= 0 || slot_minutes > MAX_SLOT_MINUTES {
            return Err(DoctorError::ValidationError(
                "slotMinutes must be between 1 and 240.".to_string(),
            ));
        }

        let booked = self.booked_intervals(doctor_id, date).await?;

        let available_slots =
            generate_free_slots(date.and_time(work_start), date.and_time(work_end), slot_minutes, &booked);

        debug!("Found {} available slots", available_slots.len());

        Ok(AvailableTimesResponse {
            doctor_id,
            date: date.format("%Y-%m-%d").to_string(),
            slot_minutes,
            work_start: work_start.format("%H:%M").to_string(),
            work_end: work_end.format("%H:%M").to_string(),
            available_slots,
        })
    }

    /// All booked intervals for the doctor on the target date.
    async fn booked_intervals(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<BookedInterval>, DoctorError> {
        let day_start = date.and_time(NaiveTime::MIN);
        let next_day = day_start + Duration::days(1);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=gte.{}&start_time=lt.{}&select=start_time,duration_minutes&order=start_time.asc",
            doctor_id,
            day_start.format("%Y-%m-%dT%H:%M:%S"),
            next_day.format("%Y-%m-%dT%H:%M:%S"),
        );

        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))
    }
}

/// Candidate slots at a fixed stride across the work window, dropping the
/// final partial slot and any candidate overlapping a booked interval under
/// half-open [start, end) semantics.
pub fn generate_free_slots(
    day_start: NaiveDateTime,
    day_end: NaiveDateTime,
    slot_minutes: i32,
    booked: &[BookedInterval],
) -> Vec<AvailableSlot> {
    let stride = Duration::minutes(slot_minutes as i64);

    let mut slots = Vec::new();
    let mut slot_start = day_start;

    while slot_start + stride <= day_end {
        let slot_end = slot_start + stride;

        let conflict = booked
            .iter()
            .any(|appt| appt.start_time < slot_end && slot_start < appt.end_time());

        if !conflict {
            slots.push(AvailableSlot {
                iso: slot_start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time: slot_start.format("%H:%M").to_string(),
            });
        }

        slot_start += stride;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 26).unwrap()
    }

    fn window(start: (u32, u32), end: (u32, u32)) -> (NaiveDateTime, NaiveDateTime) {
        (
            day().and_hms_opt(start.0, start.1, 0).unwrap(),
            day().and_hms_opt(end.0, end.1, 0).unwrap(),
        )
    }

    fn booked_at(hour: u32, minute: u32, duration_minutes: i32) -> BookedInterval {
        BookedInterval {
            start_time: day().and_hms_opt(hour, minute, 0).unwrap(),
            duration_minutes,
        }
    }

    #[test]
    fn full_working_day_yields_sixteen_slots() {
        let (start, end) = window((9, 0), (17, 0));
        let slots = generate_free_slots(start, end, 30, &[]);

        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().unwrap().time, "09:00");
        assert_eq!(slots.last().unwrap().time, "16:30");
        assert_eq!(slots.first().unwrap().iso, "2025-11-26T09:00:00");
    }

    #[test]
    fn slot_generation_is_deterministic() {
        let (start, end) = window((9, 0), (17, 0));
        let first = generate_free_slots(start, end, 30, &[]);
        let second = generate_free_slots(start, end, 30, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn booked_slot_is_excluded() {
        let (start, end) = window((9, 0), (17, 0));
        let booked = vec![booked_at(10, 0, 30)];
        let slots = generate_free_slots(start, end, 30, &booked);

        assert_eq!(slots.len(), 15);
        assert!(!slots.iter().any(|s| s.time == "10:00"));
        assert!(slots.iter().any(|s| s.time == "09:30"));
        assert!(slots.iter().any(|s| s.time == "10:30"));
    }

    #[test]
    fn long_appointment_blocks_every_overlapping_candidate() {
        let (start, end) = window((9, 0), (12, 0));
        // 09:45-10:35 straddles three half-hour candidates
        let booked = vec![booked_at(9, 45, 50)];
        let slots = generate_free_slots(start, end, 30, &booked);

        let times: Vec<&str> = slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["09:00", "11:00", "11:30"]);
    }

    #[test]
    fn back_to_back_booking_does_not_block_adjacent_slots() {
        let (start, end) = window((9, 0), (11, 0));
        let booked = vec![booked_at(9, 30, 30)];
        let slots = generate_free_slots(start, end, 30, &booked);

        let times: Vec<&str> = slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["09:00", "10:00", "10:30"]);
    }

    #[test]
    fn last_partial_slot_is_dropped() {
        let (start, end) = window((9, 0), (10, 15));
        let slots = generate_free_slots(start, end, 30, &[]);

        let times: Vec<&str> = slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["09:00", "09:30"]);
    }

    #[test]
    fn fully_booked_day_yields_empty_sequence() {
        let (start, end) = window((9, 0), (10, 0));
        let booked = vec![booked_at(9, 0, 60)];
        let slots = generate_free_slots(start, end, 30, &booked);
        assert!(slots.is_empty());
    }
}
