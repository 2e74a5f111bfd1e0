use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // CRUD requires authentication; list/get/availability stay public so the
    // booking page can render without a session.
    let admin_routes = Router::new()
        .route("/admin", get(handlers::list_doctors_paged))
        .route("/", post(handlers::create_doctor))
        .route("/{id}", put(handlers::update_doctor))
        .route("/{id}", delete(handlers::delete_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{id}", get(handlers::get_doctor))
        .route("/{id}/availabletimes", get(handlers::get_available_times))
        .merge(admin_routes)
        .with_state(state)
}
