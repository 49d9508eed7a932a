use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Uploads travel as base64 JSON, a third larger than the file itself.
fn upload_body_limit(max_record_bytes: usize) -> usize {
    max_record_bytes / 3 * 4 + 64 * 1024
}

pub fn medical_records_routes(state: Arc<AppConfig>) -> Router {
    let upload_routes = Router::new()
        .route("/", post(handlers::upload_record))
        .layer(DefaultBodyLimit::max(upload_body_limit(state.max_record_bytes)));

    Router::new()
        .merge(upload_routes)
        .route("/patients/{patient_id}", get(handlers::list_records))
        .route("/{record_id}/download", get(handlers::download_record))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
