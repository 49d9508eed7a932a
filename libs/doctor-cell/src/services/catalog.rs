use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentType, DoctorError};

/// Read access to the `appointment_types` reference table.
#[derive(Clone)]
pub struct AppointmentTypeCatalog {
    supabase: SupabaseClient,
}

impl AppointmentTypeCatalog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn from_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn list_types(&self, auth_token: Option<&str>) -> Result<Vec<AppointmentType>, DoctorError> {
        debug!("Listing appointment types");

        let types: Vec<AppointmentType> = self.supabase.request(
            Method::GET,
            "/rest/v1/appointment_types?select=*&order=id.asc",
            auth_token,
            None,
        ).await?;

        Ok(types)
    }

    pub async fn find_type(
        &self,
        type_id: i64,
        auth_token: Option<&str>,
    ) -> Result<Option<AppointmentType>, DoctorError> {
        let path = format!("/rest/v1/appointment_types?id=eq.{}&select=*", type_id);
        let mut types: Vec<AppointmentType> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        Ok(if types.is_empty() { None } else { Some(types.swap_remove(0)) })
    }

    pub async fn get_type(&self, type_id: i64, auth_token: Option<&str>) -> Result<AppointmentType, DoctorError> {
        self.find_type(type_id, auth_token)
            .await?
            .ok_or(DoctorError::AppointmentTypeNotFound(type_id))
    }

    /// Ids of every appointment type owned by a doctor.
    pub async fn type_ids_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<i64>, DoctorError> {
        debug!("Fetching appointment types for doctor {}", doctor_id);

        let path = format!("/rest/v1/appointment_types?doctor_id=eq.{}&select=*", doctor_id);
        let types: Vec<AppointmentType> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        Ok(types.into_iter().map(|t| t.id).collect())
    }
}
