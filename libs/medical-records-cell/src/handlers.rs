use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseError;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{RecordError, UploadRecordRequest};
use crate::services::MedicalRecordService;

fn into_app_error(e: anyhow::Error) -> AppError {
    if let Some(record_error) = e.downcast_ref::<RecordError>() {
        return match record_error {
            RecordError::NotFound => AppError::NotFound(record_error.to_string()),
            _ => AppError::ValidationError(record_error.to_string()),
        };
    }

    match e.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Auth(msg)) => AppError::Forbidden(msg.clone()),
        Some(SupabaseError::NotFound(_)) => AppError::NotFound("Medical record file not found".to_string()),
        _ => AppError::ExternalService(e.to_string()),
    }
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
}

fn can_read_records_of(user: &User, patient_id: Uuid) -> bool {
    user.is_admin() || user.is_doctor() || user.id == patient_id.to_string()
}

#[axum::debug_handler]
pub async fn upload_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UploadRecordRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor_id = if user.is_doctor() {
        caller_id(&user)?
    } else if user.is_admin() {
        request.doctor_id.ok_or_else(|| {
            AppError::ValidationError("doctor_id is required when uploading as admin".to_string())
        })?
    } else {
        warn!("User {} attempted to upload a medical record", user.id);
        return Err(AppError::Forbidden("Only doctors can upload medical records".to_string()));
    };

    let service = MedicalRecordService::new(&state);
    let record = service
        .upload_record(request, doctor_id, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "record": record
    }))))
}

pub async fn list_records(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !can_read_records_of(&user, patient_id) {
        return Err(AppError::Forbidden("Not authorized to view these medical records".to_string()));
    }

    let service = MedicalRecordService::new(&state);
    let records = service
        .list_records(patient_id, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "records": records,
        "total": records.len()
    })))
}

pub async fn download_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = MedicalRecordService::new(&state);
    let record = service
        .get_record(record_id, auth.token())
        .await
        .map_err(into_app_error)?;

    if !can_read_records_of(&user, record.patient_id) {
        return Err(AppError::Forbidden("Not authorized to download this medical record".to_string()));
    }

    let link = service
        .download_link(&record, auth.token())
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!(link)))
}
