use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{clamp_paging, PagedResult};
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{
    Appointment, AppointmentError, AppointmentListItem, AppointmentQueryParameters, AppointmentRow,
    RescheduleRequest, SortDir, SortKey,
};
use crate::services::booking::parse_start_time;
use crate::services::conflict::ConflictGuard;

const DEFAULT_PAGE_SIZE: i32 = 20;
const MAX_PAGE_SIZE: i32 = 200;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Admin-side appointment management: paged listing with joined doctor and
/// patient columns, cancellation, and conflict-guarded rescheduling.
pub struct AdminAppointmentService {
    supabase: SupabaseClient,
    guard: ConflictGuard,
    clock: Arc<dyn Clock>,
}

impl AdminAppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            guard: ConflictGuard::new(config),
            clock,
        }
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentQueryParameters,
        auth_token: &str,
    ) -> Result<PagedResult<AppointmentListItem>, AppointmentError> {
        let (page, page_size) =
            clamp_paging(query.page, query.page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        debug!("Listing appointments page {} (size {})", page, page_size);

        let mut path = String::from(
            "/rest/v1/appointments?select=id,doctor_id,patient_id,start_time,duration_minutes,\
             doctor:doctors!inner(name),patient:patients!inner(name,file_no)",
        );

        if let Some(doctor_id) = query.doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }

        if let Some(patient_name) = query.patient_name.as_deref() {
            let patient_name = patient_name.trim();
            if !patient_name.is_empty() {
                let pattern = urlencoding::encode(&format!("*{}*", patient_name)).into_owned();
                path.push_str(&format!("&patient.name=ilike.{}", pattern));
            }
        }

        if let Some(from) = query.from.as_deref() {
            let from = parse_date_filter(from, false)?;
            path.push_str(&format!("&start_time=gte.{}", from.format(TIMESTAMP_FORMAT)));
        }
        if let Some(to) = query.to.as_deref() {
            let to = parse_date_filter(to, true)?;
            path.push_str(&format!("&start_time=lte.{}", to.format(TIMESTAMP_FORMAT)));
        }

        path.push_str(&order_clause(
            SortKey::parse(query.sort_by.as_deref()),
            SortDir::parse(query.sort_dir.as_deref()),
        ));

        let offset = (page - 1) * page_size;
        path.push_str(&format!("&limit={}&offset={}", page_size, offset));

        let (rows, total_count): (Vec<AppointmentRow>, i64) = self
            .supabase
            .request_with_count(Method::GET, &path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(PagedResult {
            items: rows.into_iter().map(AppointmentListItem::from).collect(),
            total_count,
            page,
            page_size,
        })
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select=id,doctor_id,patient_id,start_time,duration_minutes",
            appointment_id
        );
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        self.get_appointment(appointment_id, auth_token).await?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(())
    }

    /// Moves an appointment to a new slot. The same validation rules as
    /// booking apply; the slot swap itself runs through the conflict guard.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        request: RescheduleRequest,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        self.get_appointment(appointment_id, auth_token).await?;

        if let Some(duration) = request.duration_in_minutes {
            if duration <= 0 {
                return Err(AppointmentError::ValidationError(
                    "Duration must be greater than zero.".to_string(),
                ));
            }
        }

        let raw_start = request.start_time.trim();
        if raw_start.is_empty() {
            return Err(AppointmentError::ValidationError(
                "StartTime is required.".to_string(),
            ));
        }
        let start = parse_start_time(raw_start).map_err(AppointmentError::ValidationError)?;
        if start <= self.clock.now_local() {
            return Err(AppointmentError::ValidationError(
                "Selected appointment time must be in the future.".to_string(),
            ));
        }

        self.guard
            .move_appointment(
                appointment_id,
                start,
                request.duration_in_minutes,
                Some(auth_token),
            )
            .await?;

        info!("Appointment {} rescheduled", appointment_id);
        Ok(())
    }
}

fn order_clause(key: SortKey, dir: SortDir) -> String {
    match key {
        SortKey::StartTime => format!("&order=start_time.{}", dir.as_str()),
        SortKey::Doctor => format!("&order=doctor(name).{},start_time.asc", dir.as_str()),
        SortKey::Patient => format!("&order=patient(name).{},start_time.asc", dir.as_str()),
    }
}

/// Accepts a bare date or a full datetime. A bare date expands to the start
/// of day for lower bounds and the end of day for upper bounds.
fn parse_date_filter(raw: &str, end_of_day: bool) -> Result<NaiveDateTime, AppointmentError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let bound = if end_of_day {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        if let Some(bound) = bound {
            return Ok(bound);
        }
    }

    parse_start_time(raw).map_err(|_| {
        AppointmentError::ValidationError(
            "Invalid date filter. Use ISO format like 2025-11-26.".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{order_clause, parse_date_filter};
    use crate::models::{AppointmentError, SortDir, SortKey};
    use assert_matches::assert_matches;

    #[test]
    fn order_clause_covers_every_sort_key() {
        assert_eq!(
            order_clause(SortKey::StartTime, SortDir::Desc),
            "&order=start_time.desc"
        );
        assert_eq!(
            order_clause(SortKey::Doctor, SortDir::Asc),
            "&order=doctor(name).asc,start_time.asc"
        );
        assert_eq!(
            order_clause(SortKey::Patient, SortDir::Desc),
            "&order=patient(name).desc,start_time.asc"
        );
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let from = parse_date_filter("2025-11-26", false).unwrap();
        assert_eq!(from.format("%H:%M:%S").to_string(), "00:00:00");

        let to = parse_date_filter("2025-11-26", true).unwrap();
        assert_eq!(to.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn full_datetimes_pass_through() {
        let dt = parse_date_filter("2025-11-26T14:30:00", false).unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "14:30:00");
    }

    #[test]
    fn garbage_date_filters_are_rejected() {
        assert_matches!(
            parse_date_filter("next tuesday", false),
            Err(AppointmentError::ValidationError(msg)) if msg.starts_with("Invalid date filter")
        );
    }
}
