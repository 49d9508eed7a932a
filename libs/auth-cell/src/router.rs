use std::sync::Arc;

use axum::{
    Extension,
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::events::SessionEvents;
use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>, events: SessionEvents) -> Router {
    let public_routes = Router::new()
        .route("/sign-in", post(handlers::sign_in))
        .route("/sign-up", post(handlers::sign_up))
        .route("/refresh", post(handlers::refresh_session))
        .route("/validate", post(handlers::validate_token))
        .route("/verify", post(handlers::verify_token));

    let protected_routes = Router::new()
        .route("/sign-out", post(handlers::sign_out))
        .route("/session", get(handlers::get_session))
        .route("/profile", put(handlers::update_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(events))
        .with_state(state)
}
