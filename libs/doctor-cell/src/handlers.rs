use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, PriceQuery, RegisterDoctorRequest};
use crate::services::pricing;
use crate::services::{AppointmentTypeCatalog, DoctorRegistrationService};

fn into_app_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::AppointmentTypeNotFound(id) => {
            AppError::NotFound(format!("Appointment type {} not found", id))
        }
        DoctorError::AlreadyRegistered(email) => {
            AppError::Conflict(format!("A user with email {} is already registered", email))
        }
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::ServiceRoleUnavailable => AppError::Internal(e.to_string()),
        DoctorError::DatabaseError(msg) => AppError::ExternalService(msg),
    }
}

/// Admin-only: creates the doctor account, profile and appointment type.
#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.is_admin() {
        warn!("User {} attempted doctor registration without admin role", user.id);
        return Err(AppError::Forbidden("Only administrators can register doctors".to_string()));
    }

    let service = DoctorRegistrationService::new(&state);
    let registered = service.register(request).await.map_err(into_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "doctor": registered.doctor,
        "appointment_type": registered.appointment_type,
        "message": "Doctor registered successfully"
    }))))
}

pub async fn list_appointment_types(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let catalog = AppointmentTypeCatalog::new(&state);
    let types = catalog.list_types(None).await.map_err(into_app_error)?;

    Ok(Json(json!({
        "appointment_types": types,
        "total": types.len()
    })))
}

pub async fn get_appointment_type(
    State(state): State<Arc<AppConfig>>,
    Path(type_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let catalog = AppointmentTypeCatalog::new(&state);
    let appointment_type = catalog.get_type(type_id, None).await.map_err(into_app_error)?;

    Ok(Json(json!(appointment_type)))
}

pub async fn quote_price(Query(query): Query<PriceQuery>) -> Json<Value> {
    let quote = pricing::quote(query.specialization.as_deref(), query.years_of_experience);
    Json(json!(quote))
}
