use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{
    AvailableTimesQuery, CreateDoctorRequest, DoctorError, DoctorQueryParameters, UpdateDoctorRequest,
};
use crate::services::{availability::AvailabilityService, doctor::DoctorService};

fn map_doctor_err(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound(err.to_string()),
        DoctorError::DuplicateName
        | DoctorError::HasAppointments
        | DoctorError::ValidationError(_) => AppError::BadRequest(err.to_string()),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctors = service.list_doctors().await.map_err(map_doctor_err)?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctor = service.get_doctor(doctor_id).await.map_err(map_doctor_err)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_available_times(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let response = service
        .available_times(doctor_id, query)
        .await
        .map_err(map_doctor_err)?;

    Ok(Json(json!(response)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors_paged(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<DoctorQueryParameters>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let service = DoctorService::new(&config);

    let paged = service
        .list_doctors_paged(query, auth.token())
        .await
        .map_err(map_doctor_err)?;

    Ok(Json(json!(paged)))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;
    let service = DoctorService::new(&config);

    let doctor = service
        .create_doctor(request, auth.token())
        .await
        .map_err(map_doctor_err)?;

    Ok((StatusCode::CREATED, Json(json!({ "id": doctor.id }))))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    let service = DoctorService::new(&config);

    service
        .update_doctor(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_err)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    let service = DoctorService::new(&config);

    service
        .delete_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_err)?;

    Ok(StatusCode::NO_CONTENT)
}
