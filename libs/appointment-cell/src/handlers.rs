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

use crate::models::{AppointmentError, AppointmentQueryParameters, BookingRequest, RescheduleRequest};
use crate::services::{admin::AdminAppointmentService, booking::BookingService};

fn map_appointment_err(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::NotFound => AppError::NotFound(err.to_string()),
        AppointmentError::ConflictDetected => AppError::Conflict(err.to_string()),
        AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // The public form only ever submits bare digits; anything else is a
    // malformed client. The resolver is more lenient for trusted callers.
    let phone = request.patient.phone.trim();
    if !phone.is_empty() && !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "Phone number must contain digits only (0-9).".to_string(),
        ));
    }

    let service = BookingService::new(&config);
    let result = service.book(&request, None).await.map_err(map_appointment_err)?;

    if !result.success {
        return Err(AppError::BadRequest(result.message));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "appointmentId": result.appointment_id })),
    ))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentQueryParameters>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let service = AdminAppointmentService::new(&config);

    let paged = service
        .list_appointments(query, auth.token())
        .await
        .map_err(map_appointment_err)?;

    Ok(Json(json!(paged)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let service = AdminAppointmentService::new(&config);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_err)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<RescheduleRequest>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    let service = AdminAppointmentService::new(&config);

    service
        .reschedule_appointment(appointment_id, request, auth.token())
        .await
        .map_err(map_appointment_err)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    let service = AdminAppointmentService::new(&config);

    service
        .cancel_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_err)?;

    Ok(StatusCode::NO_CONTENT)
}
