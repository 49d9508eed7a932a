use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/appointment-types", get(handlers::list_appointment_types))
        .route("/appointment-types/{type_id}", get(handlers::get_appointment_type))
        .route("/pricing/quote", get(handlers::quote_price));

    let protected_routes = Router::new()
        .route("/register", post(handlers::register_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
