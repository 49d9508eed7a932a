use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::SupabaseError;

/// A bookable service offered by one doctor. Created once, at registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentType {
    pub id: i64,
    pub name: String,
    pub price: f64,
    /// Minutes.
    pub duration: i32,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub doctor_specialization: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub qualification: String,
    pub years_of_experience: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDoctorRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub specialization: String,
    pub qualification: String,
    pub years_of_experience: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredDoctor {
    pub doctor: Doctor,
    pub appointment_type: AppointmentType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuery {
    pub specialization: Option<String>,
    pub years_of_experience: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub specialization: String,
    pub price: f64,
    pub duration: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Appointment type {0} not found")]
    AppointmentTypeNotFound(i64),

    #[error("A user with email {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Doctor registration requires the service-role key to be configured")]
    ServiceRoleUnavailable,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<SupabaseError> for DoctorError {
    fn from(err: SupabaseError) -> Self {
        DoctorError::DatabaseError(err.to_string())
    }
}
