use std::sync::Arc;

use axum::{routing::get, Json, Router};
use http::Method;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/doctors", doctor_routes(config.clone()))
        .nest("/api/patients", patient_routes(config.clone()))
        .nest("/api/appointments", appointment_routes(config))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({ "service": "clinic-api", "status": "running" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
