use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::error::AppError;
use shared_utils::validation::{require_email, require_min_len, require_password_pair};

use crate::models::{AppointmentType, Doctor, DoctorError, RegisterDoctorRequest, RegisteredDoctor};
use crate::services::pricing::{calculate_cost, calculate_duration};

#[derive(Debug, Deserialize)]
struct CreatedAuthUser {
    id: Uuid,
}

/// Creates doctor accounts. Runs with the service-role key, so the `doctor`
/// role lands in `app_metadata` where clients cannot forge it.
pub struct DoctorRegistrationService {
    admin: SupabaseClient,
    enabled: bool,
}

impl DoctorRegistrationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            admin: SupabaseClient::service_role(config),
            enabled: config.has_service_role(),
        }
    }

    pub fn validate(request: &RegisterDoctorRequest) -> Result<(), DoctorError> {
        let check = || -> Result<(), AppError> {
            require_min_len("Full name", &request.full_name, 2)?;
            require_email(&request.email)?;
            require_password_pair(&request.password, &request.confirm_password)?;
            require_min_len("Specialization", &request.specialization, 3)?;
            require_min_len("Qualification", &request.qualification, 2)?;
            Ok(())
        };

        check().map_err(|e| match e {
            AppError::ValidationError(msg) => DoctorError::ValidationError(msg),
            other => DoctorError::ValidationError(other.to_string()),
        })?;

        if request.years_of_experience <= 0 {
            return Err(DoctorError::ValidationError(
                "Years of experience must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn register(&self, request: RegisterDoctorRequest) -> Result<RegisteredDoctor, DoctorError> {
        if !self.enabled {
            return Err(DoctorError::ServiceRoleUnavailable);
        }

        Self::validate(&request)?;
        info!("Registering doctor {}", request.email);

        let auth_user = self.create_auth_user(&request).await?;

        match self.create_profile_rows(auth_user.id, &request).await {
            Ok(registered) => {
                info!("Doctor {} registered with appointment type {}",
                      registered.doctor.id, registered.appointment_type.id);
                Ok(registered)
            }
            Err(e) => {
                warn!("Doctor profile creation failed for {}, removing auth user: {}", auth_user.id, e);
                self.delete_auth_user(auth_user.id).await;
                Err(e)
            }
        }
    }

    async fn create_auth_user(&self, request: &RegisterDoctorRequest) -> Result<CreatedAuthUser, DoctorError> {
        let body = json!({
            "email": request.email.trim(),
            "password": request.password,
            "email_confirm": true,
            "app_metadata": { "role": "doctor" },
            "user_metadata": { "full_name": request.full_name.trim() }
        });

        self.admin
            .request::<CreatedAuthUser>(
                Method::POST,
                "/auth/v1/admin/users",
                Some(self.admin.api_key()),
                Some(body),
            )
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict(_) | SupabaseError::Api { status: 422, .. } => {
                    DoctorError::AlreadyRegistered(request.email.trim().to_string())
                }
                other => DoctorError::from(other),
            })
    }

    async fn create_profile_rows(
        &self,
        doctor_id: Uuid,
        request: &RegisterDoctorRequest,
    ) -> Result<RegisteredDoctor, DoctorError> {
        let service_token = Some(self.admin.api_key());
        let specialization = request.specialization.trim();

        let doctors: Vec<Doctor> = self.admin.insert(
            "doctors",
            service_token,
            json!({
                "id": doctor_id,
                "name": request.full_name.trim(),
                "email": request.email.trim(),
                "specialization": specialization,
                "qualification": request.qualification.trim(),
                "years_of_experience": request.years_of_experience
            }),
        ).await?;
        let doctor = doctors.into_iter().next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor profile".to_string()))?;

        let price = calculate_cost(Some(specialization), Some(request.years_of_experience));
        let duration = calculate_duration(Some(specialization));
        debug!("Appointment type for {}: price {} duration {}", doctor_id, price, duration);

        let types: Vec<AppointmentType> = self.admin.insert(
            "appointment_types",
            service_token,
            json!({
                "doctor_id": doctor_id,
                "doctor_name": request.full_name.trim(),
                "doctor_specialization": specialization,
                "name": format!("{} Appointment", specialization),
                "price": price,
                "duration": duration
            }),
        ).await?;
        let appointment_type = types.into_iter().next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create appointment type".to_string()))?;

        Ok(RegisteredDoctor { doctor, appointment_type })
    }

    async fn delete_auth_user(&self, user_id: Uuid) {
        let path = format!("/auth/v1/admin/users/{}", user_id);
        if let Err(e) = self.admin
            .execute(Method::DELETE, &path, Some(self.admin.api_key()), None)
            .await
        {
            warn!("Could not remove auth user {} after failed registration: {}", user_id, e);
        }
    }
}
