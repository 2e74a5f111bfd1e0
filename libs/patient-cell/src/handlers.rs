use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{PatientError, PatientSearchQuery};
use crate::services::resolver::PatientResolver;

fn map_patient_err(err: PatientError) -> AppError {
    match err {
        PatientError::NotFound => AppError::NotFound(err.to_string()),
        PatientError::ValidationError(_) => AppError::BadRequest(err.to_string()),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let resolver = PatientResolver::new(&config);

    let patient = resolver
        .get_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_err)?;

    Ok(Json(json!(patient)))
}

/// Admin lookup by file number or phone, mirroring the resolution order used
/// during booking.
#[axum::debug_handler]
pub async fn search_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let resolver = PatientResolver::new(&config);

    let mut found = None;
    if let Some(file_no) = query.file_no.as_deref() {
        found = resolver
            .find_by_file_no(file_no, auth.token())
            .await
            .map_err(map_patient_err)?;
    }
    if found.is_none() {
        if let Some(phone) = query.phone.as_deref() {
            found = resolver
                .find_by_phone(phone, auth.token())
                .await
                .map_err(map_patient_err)?;
        }
    }

    let patient = found.ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

    Ok(Json(json!(patient)))
}
