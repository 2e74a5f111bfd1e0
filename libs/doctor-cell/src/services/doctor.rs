use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{clamp_paging, PagedResult};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, DoctorQueryParameters, UpdateDoctorRequest};

const DEFAULT_PAGE_SIZE: i32 = 10;
const MAX_PAGE_SIZE: i32 = 100;

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Public list used by the booking page: every doctor, name-ordered.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors");

        let path = "/rest/v1/doctors?select=id,name,specialization&order=name.asc";
        let result: Vec<Doctor> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(result)
    }

    /// Admin listing with search over name and specialization.
    pub async fn list_doctors_paged(
        &self,
        query: DoctorQueryParameters,
        auth_token: &str,
    ) -> Result<PagedResult<Doctor>, DoctorError> {
        let (page, page_size) = clamp_paging(query.page, query.page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        debug!("Listing doctors page {} (size {})", page, page_size);

        let mut path = String::from("/rest/v1/doctors?select=id,name,specialization");

        if let Some(search) = query.search.as_deref() {
            let search = search.trim();
            if !search.is_empty() {
                let pattern = urlencoding::encode(&format!("*{}*", search)).into_owned();
                path.push_str(&format!(
                    "&or=(name.ilike.{pattern},specialization.ilike.{pattern})",
                    pattern = pattern
                ));
            }
        }

        let offset = (page - 1) * page_size;
        path.push_str(&format!("&order=name.asc&limit={}&offset={}", page_size, offset));

        let (items, total_count): (Vec<Doctor>, i64) = self
            .supabase
            .request_with_count(Method::GET, &path, Some(auth_token))
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(PagedResult {
            items,
            total_count,
            page,
            page_size,
        })
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}&select=id,name,specialization", doctor_id);
        let result: Vec<Doctor> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        let (name, specialization) = validate_doctor_fields(&request.name, &request.specialization)?;

        if self.name_exists(&name, None, auth_token).await? {
            return Err(DoctorError::DuplicateName);
        }

        let doctor_data = json!({
            "name": name,
            "specialization": specialization,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Doctor> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor".to_string()))?;

        debug!("Doctor created with ID: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor: {}", doctor_id);

        // 404 before validation, matching the create/update asymmetry callers expect
        self.get_doctor(doctor_id).await?;

        let (name, specialization) = validate_doctor_fields(&request.name, &request.specialization)?;

        if self.name_exists(&name, Some(doctor_id), auth_token).await? {
            return Err(DoctorError::DuplicateName);
        }

        let update_data = json!({
            "name": name,
            "specialization": specialization,
        });

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Doctor> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update_data), Some(headers))
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to update doctor".to_string()))
    }

    /// Refuses deletion while any appointment still references the doctor.
    pub async fn delete_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<(), DoctorError> {
        debug!("Deleting doctor: {}", doctor_id);

        self.get_doctor(doctor_id).await?;

        let appts_path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&select=id&limit=1",
            doctor_id
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &appts_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DoctorError::HasAppointments);
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Case-insensitive duplicate-name probe; ilike without wildcards is an
    /// exact case-insensitive match.
    async fn name_exists(
        &self,
        name: &str,
        exclude_id: Option<i64>,
        auth_token: &str,
    ) -> Result<bool, DoctorError> {
        let mut path = format!(
            "/rest/v1/doctors?name=ilike.{}&select=id&limit=1",
            urlencoding::encode(name)
        );

        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(!existing.is_empty())
    }
}

/// Shared create/update field validation; returns the trimmed values.
fn validate_doctor_fields(name: &str, specialization: &str) -> Result<(String, String), DoctorError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DoctorError::ValidationError("Doctor name is required.".to_string()));
    }
    if name.len() < 2 || name.len() > 120 {
        return Err(DoctorError::ValidationError(
            "Doctor name must be between 2 and 120 characters.".to_string(),
        ));
    }

    let specialization = specialization.trim();
    if specialization.is_empty() {
        return Err(DoctorError::ValidationError("Specialization is required.".to_string()));
    }
    if specialization.len() < 2 || specialization.len() > 80 {
        return Err(DoctorError::ValidationError(
            "Specialization must be between 2 and 80 characters.".to_string(),
        ));
    }

    Ok((name.to_string(), specialization.to_string()))
}
