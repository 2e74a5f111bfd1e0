use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Booking is open to the public form; everything else is admin-only.
    let admin_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/{id}", get(handlers::get_appointment))
        .route("/{id}", put(handlers::reschedule_appointment))
        .route("/{id}", delete(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", post(handlers::book_appointment))
        .merge(admin_routes)
        .with_state(state)
}
