use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::{HeaderMap, StatusCode},
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt;

use crate::events::{AuthEvent, SessionEvents};
use crate::models::{AuthError, RefreshRequest, SignInRequest, SignUpRequest, UpdateProfileRequest};
use crate::services::SessionService;

fn into_app_error(e: AuthError) -> AppError {
    match e {
        AuthError::InvalidCredentials => AppError::Auth(e.to_string()),
        AuthError::SessionExpired(_) => AppError::Auth(e.to_string()),
        AuthError::AlreadyRegistered(_) => AppError::Conflict(e.to_string()),
        AuthError::ValidationError(msg) => AppError::ValidationError(msg),
        AuthError::ServiceError(msg) => AppError::ExternalService(msg),
    }
}

pub async fn sign_in(
    State(config): State<Arc<AppConfig>>,
    Extension(events): Extension<SessionEvents>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SessionService::new(&config);
    let session = service.sign_in(request).await.map_err(into_app_error)?;

    let user = User::from(session.user.clone());
    events.publish(AuthEvent::SignedIn { user_id: user.id.clone(), role: user.user_role() });

    Ok(Json(json!({
        "session": session,
        "role": user.user_role()
    })))
}

pub async fn sign_up(
    State(config): State<Arc<AppConfig>>,
    Extension(events): Extension<SessionEvents>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = SessionService::new(&config);
    let outcome = service.sign_up(request).await.map_err(into_app_error)?;

    if outcome.session.is_some() {
        let user = User::from(outcome.user.clone());
        events.publish(AuthEvent::SignedIn { user_id: user.id.clone(), role: user.user_role() });
    }

    Ok((StatusCode::CREATED, Json(json!({
        "user": outcome.user,
        "session": outcome.session,
        "message": "Registration successful"
    }))))
}

pub async fn sign_out(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(events): Extension<SessionEvents>,
) -> Result<StatusCode, AppError> {
    let service = SessionService::new(&config);
    service.sign_out(auth.token()).await.map_err(into_app_error)?;

    events.publish(AuthEvent::SignedOut { user_id: user.id });
    Ok(StatusCode::NO_CONTENT)
}

/// The caller as the auth service currently knows them.
pub async fn get_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = SessionService::new(&config);
    let auth_user = service.current_user(auth.token()).await.map_err(into_app_error)?;
    let user = User::from(auth_user);

    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "full_name": user.full_name(),
        "role": user.user_role()
    })))
}

pub async fn refresh_session(
    State(config): State<Arc<AppConfig>>,
    Extension(events): Extension<SessionEvents>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SessionService::new(&config);
    let session = service.refresh(&request.refresh_token).await.map_err(into_app_error)?;

    events.publish(AuthEvent::TokenRefreshed { user_id: session.user.id.clone() });
    Ok(Json(json!({ "session": session })))
}

pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(events): Extension<SessionEvents>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Updating profile for user: {}", user.id);

    let service = SessionService::new(&config);
    let updated = service
        .update_full_name(auth.token(), &request.full_name)
        .await
        .map_err(into_app_error)?;

    events.publish(AuthEvent::UserUpdated { user_id: user.id });
    Ok(Json(json!({ "user": updated })))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(&headers)?;
    let user = jwt::validate_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        role: user.user_role(),
        user_id: user.id,
        email: user.email,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(&headers)?;
    let valid = jwt::validate_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}
