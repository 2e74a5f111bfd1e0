use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, PatientError, PatientHints};

const PATIENT_COLUMNS: &str = "id,file_no,name,phone,address,date_of_birth,gender";

pub struct PatientResolver {
    supabase: SupabaseClient,
}

impl PatientResolver {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Maps booking identity hints onto exactly one stored patient.
    ///
    /// Lookup order is file number first, then normalized phone. A miss on
    /// both creates a new record; a hit backfills any blank stored fields
    /// without ever overwriting populated ones.
    pub async fn resolve(&self, hints: &PatientHints, auth_token: &str) -> Result<Patient, PatientError> {
        let fields = validate_hints(hints)?;
        debug!("Resolving patient, file_no: {}", fields.file_no);

        let existing = match self.find_by_file_no(&fields.file_no, auth_token).await? {
            Some(patient) => Some(patient),
            None => self.find_by_phone(&fields.phone, auth_token).await?,
        };

        match existing {
            Some(patient) => self.backfill(patient, &fields, auth_token).await,
            None => self.create(&fields, auth_token).await,
        }
    }

    pub async fn get_patient(&self, patient_id: i64, auth_token: &str) -> Result<Patient, PatientError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select={}",
            patient_id, PATIENT_COLUMNS
        );
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn find_by_file_no(
        &self,
        file_no: &str,
        auth_token: &str,
    ) -> Result<Option<Patient>, PatientError> {
        let file_no = file_no.trim();
        if file_no.is_empty() {
            return Ok(None);
        }

        let path = format!(
            "/rest/v1/patients?file_no=eq.{}&select={}&limit=1",
            urlencoding::encode(file_no),
            PATIENT_COLUMNS
        );
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    pub async fn find_by_phone(
        &self,
        phone: &str,
        auth_token: &str,
    ) -> Result<Option<Patient>, PatientError> {
        let digits = normalize_phone(phone);
        if digits.is_empty() {
            return Ok(None);
        }

        let path = format!(
            "/rest/v1/patients?phone=eq.{}&select={}&limit=1",
            digits, PATIENT_COLUMNS
        );
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn create(&self, fields: &PatientFields, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Creating patient, file_no: {}", fields.file_no);

        let patient_data = json!({
            "file_no": fields.file_no,
            "name": fields.name,
            "phone": fields.phone,
            "address": fields.address,
            "date_of_birth": fields.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": fields.gender,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(patient_data),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient".to_string()))
    }

    /// Fills in blank stored fields from the request. First write wins: a
    /// populated stored field is never replaced.
    async fn backfill(
        &self,
        patient: Patient,
        fields: &PatientFields,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let patch = missing_field_patch(&patient, fields);
        if patch.is_empty() {
            return Ok(patient);
        }

        debug!("Backfilling {} field(s) for patient {}", patch.len(), patient.id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient.id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(patch)),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to update patient".to_string()))
    }
}

/// Hints with trimming, phone normalization and date parsing already applied.
#[derive(Debug)]
struct PatientFields {
    file_no: String,
    name: String,
    phone: String,
    address: String,
    date_of_birth: NaiveDate,
    gender: String,
}

/// Strips every non-digit character. Formatting like "+90 (532) 111-22-33"
/// and "05321112233" must resolve to the same patient.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Field validation without any storage access. Booking runs this up front
/// so a bad patient field is reported before doctor or patient lookups.
pub fn validate_patient_hints(hints: &PatientHints) -> Result<(), PatientError> {
    validate_hints(hints).map(|_| ())
}

/// Accepts a bare ISO date or a full datetime, keeping the date part.
fn parse_date_of_birth(raw: &str) -> Result<NaiveDate, PatientError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }

    Err(PatientError::ValidationError(
        "Invalid date of birth format. Use ISO format like 1990-01-01.".to_string(),
    ))
}

fn validate_hints(hints: &PatientHints) -> Result<PatientFields, PatientError> {
    let name = hints.name.trim();
    if name.is_empty() {
        return Err(PatientError::ValidationError("Patient name is required.".to_string()));
    }

    let file_no = hints.file_no.as_deref().unwrap_or("").trim().to_string();
    if file_no.is_empty() {
        return Err(PatientError::ValidationError(
            "Patient file number is required.".to_string(),
        ));
    }

    let raw_phone = hints.phone.trim();
    if raw_phone.is_empty() {
        return Err(PatientError::ValidationError("Patient phone is required.".to_string()));
    }
    let phone = normalize_phone(raw_phone);
    if phone.is_empty() {
        return Err(PatientError::ValidationError(
            "Patient phone must contain digits.".to_string(),
        ));
    }

    let address = hints.address.trim();
    if address.is_empty() {
        return Err(PatientError::ValidationError(
            "Patient address is required.".to_string(),
        ));
    }

    let dob = hints.date_of_birth.trim();
    if dob.is_empty() {
        return Err(PatientError::ValidationError(
            "Patient date of birth is required.".to_string(),
        ));
    }
    let date_of_birth = parse_date_of_birth(dob)?;

    let gender = hints.gender.trim();
    if gender.is_empty() {
        return Err(PatientError::ValidationError(
            "Patient gender is required.".to_string(),
        ));
    }

    Ok(PatientFields {
        file_no,
        name: name.to_string(),
        phone,
        address: address.to_string(),
        date_of_birth,
        gender: gender.to_string(),
    })
}

/// Computes the PATCH body for a matched patient: only columns that are
/// currently blank and have a value in the request.
fn missing_field_patch(stored: &Patient, fields: &PatientFields) -> Map<String, Value> {
    let mut patch = Map::new();

    if stored.name.trim().is_empty() {
        patch.insert("name".to_string(), json!(fields.name));
    }
    if stored.phone.trim().is_empty() {
        patch.insert("phone".to_string(), json!(fields.phone));
    }
    if stored.address.trim().is_empty() {
        patch.insert("address".to_string(), json!(fields.address));
    }
    if stored.date_of_birth.is_none() {
        patch.insert(
            "date_of_birth".to_string(),
            json!(fields.date_of_birth.format("%Y-%m-%d").to_string()),
        );
    }
    if stored.gender.trim().is_empty() {
        patch.insert("gender".to_string(), json!(fields.gender));
    }

    patch
}
