// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, BookAppointmentRequest, ReserveSlotRequest, ScheduleQuery, SlotsQuery,
};
use crate::services::booking::AppointmentBookingService;

fn into_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound(e.to_string()),
        AppointmentError::AppointmentTypeNotFound(_) => AppError::NotFound(e.to_string()),
        AppointmentError::SlotConflict => AppError::Conflict(e.to_string()),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
        AppointmentError::Unauthorized(msg) => AppError::Forbidden(msg),
        AppointmentError::DatabaseError(msg) => AppError::ExternalService(msg),
    }
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
}

// ==============================================================================
// BOOKING
// ==============================================================================

/// Books a slot. Patients book for themselves; admins may book on behalf of a patient.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = caller_id(&user)?;
    let patient_id = request.patient_id.unwrap_or(caller);

    if patient_id != caller && !user.is_admin() {
        warn!("User {} attempted to book for patient {}", user.id, patient_id);
        return Err(AppError::Forbidden("Not authorized to book appointment for this patient".to_string()));
    }

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .reserve(
            ReserveSlotRequest {
                appointment_type_id: request.appointment_type_id,
                start_time: request.start_time,
                patient_id,
                location: request.location,
                notes: request.notes,
            },
            auth.token(),
        )
        .await
        .map_err(into_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    }))))
}

pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let slots = service
        .available_slots(query.appointment_type_id, query.date, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "appointment_type_id": query.appointment_type_id,
        "date": query.date,
        "slots": slots
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = caller_id(&user)?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .patient_appointments(patient_id, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_doctor_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden("Only doctors have a schedule".to_string()));
    }
    let doctor_id = caller_id(&user)?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .doctor_schedule(doctor_id, query.date, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .get_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .cancel(appointment_id, &user, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .complete(appointment_id, &user, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}
