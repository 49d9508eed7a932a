// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::models::AppointmentType;
use doctor_cell::services::AppointmentTypeCatalog;
use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookedSlot, NewAppointment, SlotWindow,
};

const LISTING_SELECT: &str =
    "*,appointment_type:appointment_types(name,duration,price,doctor_id,doctor_name,doctor_specialization)";
const SCHEDULE_SELECT: &str =
    "*,appointment_type:appointment_types(name,duration,price,doctor_id,doctor_name,doctor_specialization),patient:patients(name,email)";

/// Persistence seam for appointments.
///
/// `insert_if_free` is the only write path for new bookings and must refuse the
/// row when an `upcoming` booking of the same type overlaps its slot, atomically
/// with respect to concurrent callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_appointment_type(
        &self,
        type_id: i64,
        auth_token: &str,
    ) -> Result<Option<AppointmentType>, AppointmentError>;

    async fn appointment_type_ids_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<i64>, AppointmentError>;

    /// Starts of `upcoming` bookings of the type in `[from, to)`, any patient.
    async fn booked_slots(
        &self,
        type_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError>;

    /// `upcoming` bookings of the type whose slot overlaps `window`.
    async fn find_conflicting(
        &self,
        type_id: i64,
        window: SlotWindow,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError>;

    async fn insert_if_free(
        &self,
        appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError>;

    /// Compare-and-set on status. `None` when the row was not in `from`.
    async fn transition_status(
        &self,
        appointment_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError>;

    /// Newest first, with the appointment type embedded.
    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Bookings of any of `type_ids` starting in `[from, to)`, oldest first.
    async fn list_for_types_between(
        &self,
        type_ids: &[i64],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;
}

pub(crate) fn timestamp_param(at: DateTime<Utc>) -> String {
    urlencoding::encode(&at.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

fn map_supabase_error(err: SupabaseError) -> AppointmentError {
    match err {
        SupabaseError::Auth(msg) => AppointmentError::Unauthorized(msg),
        SupabaseError::NotFound(_) => AppointmentError::NotFound,
        other => AppointmentError::DatabaseError(other.to_string()),
    }
}

/// PostgREST answers 409 both for the slot exclusion constraint and for
/// foreign-key violations (`23503`). Only the former is a slot conflict.
fn map_insert_error(err: SupabaseError) -> AppointmentError {
    match err {
        SupabaseError::Conflict(body) if body.contains("23503") => {
            AppointmentError::ValidationError("Appointment references an unknown patient or type".to_string())
        }
        SupabaseError::Conflict(_) => AppointmentError::SlotConflict,
        other => map_supabase_error(other),
    }
}

/// `appointments` table over PostgREST. The database's exclusion constraint
/// on `(appointment_type_id, tstzrange(start_time, start_time + 30 min))`
/// for upcoming rows makes the insert atomic.
#[derive(Clone)]
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
    catalog: AppointmentTypeCatalog,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = SupabaseClient::new(config);
        Self {
            catalog: AppointmentTypeCatalog::from_client(supabase.clone()),
            supabase,
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_appointment_type(
        &self,
        type_id: i64,
        auth_token: &str,
    ) -> Result<Option<AppointmentType>, AppointmentError> {
        Ok(self.catalog.find_type(type_id, Some(auth_token)).await?)
    }

    async fn appointment_type_ids_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<i64>, AppointmentError> {
        Ok(self.catalog.type_ids_for_doctor(doctor_id, Some(auth_token)).await?)
    }

    /// Other patients' rows are hidden by row level security; the
    /// `booked_slots` function returns only type and start time.
    async fn booked_slots(
        &self,
        type_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        self.supabase
            .request(
                Method::POST,
                "/rest/v1/rpc/booked_slots",
                Some(auth_token),
                Some(json!({ "p_type_id": type_id, "p_from": from, "p_to": to })),
            )
            .await
            .map_err(map_supabase_error)
    }

    async fn find_conflicting(
        &self,
        type_id: i64,
        window: SlotWindow,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        let booked = self
            .booked_slots(type_id, window.earliest_conflicting_start(), window.end, auth_token)
            .await?;

        Ok(booked.into_iter().filter(|b| b.slot().overlaps(&window)).collect())
    }

    async fn insert_if_free(
        &self,
        appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Inserting appointment for type {} at {}",
            appointment.appointment_type_id, appointment.start_time
        );

        let row = serde_json::to_value(&appointment)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut stored: Vec<Appointment> = self.supabase
            .insert("appointments", Some(auth_token), row)
            .await
            .map_err(map_insert_error)?;

        if stored.is_empty() {
            warn!("Insert returned no representation for type {}", appointment.appointment_type_id);
            return Err(AppointmentError::DatabaseError("Insert returned no rows".to_string()));
        }

        Ok(stored.swap_remove(0))
    }

    async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", appointment_id, LISTING_SELECT);
        let mut rows: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_supabase_error)?;

        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id,
            from.as_str()
        );

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let mut rows: Vec<Appointment> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": to })),
                Some(headers),
            )
            .await
            .map_err(map_supabase_error)?;

        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&select={}&order=start_time.desc",
            patient_id, LISTING_SELECT
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_supabase_error)
    }

    async fn list_for_types_between(
        &self,
        type_ids: &[i64],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if type_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = type_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let path = format!(
            "/rest/v1/appointments?appointment_type_id=in.({})&start_time=gte.{}&start_time=lt.{}&select={}&order=start_time.asc",
            ids,
            timestamp_param(from),
            timestamp_param(to),
            SCHEDULE_SELECT,
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_supabase_error)
    }
}
