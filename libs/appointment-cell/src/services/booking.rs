// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, NewAppointment, ReserveSlotRequest,
    SlotAvailability, SlotWindow,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::meeting::MeetingLinkGenerator;
use crate::services::slots;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

pub struct AppointmentBookingService<S: AppointmentStore = SupabaseAppointmentStore> {
    store: Arc<S>,
    meeting: MeetingLinkGenerator,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService<SupabaseAppointmentStore> {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(
            Arc::new(SupabaseAppointmentStore::new(config)),
            &config.meeting_base_url,
        )
    }
}

impl<S: AppointmentStore> AppointmentBookingService<S> {
    pub fn with_store(store: Arc<S>, meeting_base_url: &str) -> Self {
        Self {
            store,
            meeting: MeetingLinkGenerator::new(meeting_base_url),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    fn validate_request(&self, request: &ReserveSlotRequest) -> Result<(), AppointmentError> {
        if request.location.trim().is_empty() {
            return Err(AppointmentError::ValidationError("Location is required".to_string()));
        }

        if request.start_time.second() != 0 || request.start_time.nanosecond() != 0 {
            return Err(AppointmentError::ValidationError(
                "Start time must fall on a whole minute".to_string(),
            ));
        }

        Ok(())
    }

    /// Books `[start_time, start_time + 30 min)` for the appointment type.
    ///
    /// The pre-check gives a fast answer for the common case; the store's
    /// conditional insert is what guarantees two callers never both win.
    pub async fn reserve(
        &self,
        request: ReserveSlotRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Reserving type {} at {} for patient {}",
            request.appointment_type_id, request.start_time, request.patient_id
        );

        self.validate_request(&request)?;

        if self
            .store
            .find_appointment_type(request.appointment_type_id, auth_token)
            .await?
            .is_none()
        {
            return Err(AppointmentError::AppointmentTypeNotFound(request.appointment_type_id));
        }

        let window = SlotWindow::starting_at(request.start_time);
        let conflicting = self
            .store
            .find_conflicting(request.appointment_type_id, window, auth_token)
            .await?;
        if !conflicting.is_empty() {
            info!(
                "Slot {} for type {} overlaps the booking at {}",
                request.start_time, request.appointment_type_id, conflicting[0].start_time
            );
            return Err(AppointmentError::SlotConflict);
        }

        let meeting_url = self.meeting.link_for(&request.location);
        let new_appointment = NewAppointment {
            patient_id: request.patient_id,
            appointment_type_id: request.appointment_type_id,
            start_time: request.start_time,
            status: AppointmentStatus::Upcoming,
            notes: request.notes,
            location: request.location,
            meeting_url,
        };

        let appointment = self.store.insert_if_free(new_appointment, auth_token).await?;

        info!(
            "Appointment {} booked for patient {} at {}",
            appointment.id, appointment.patient_id, appointment.start_time
        );

        Ok(appointment)
    }

    pub async fn available_slots(
        &self,
        appointment_type_id: i64,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<SlotAvailability>, AppointmentError> {
        if self
            .store
            .find_appointment_type(appointment_type_id, auth_token)
            .await?
            .is_none()
        {
            return Err(AppointmentError::AppointmentTypeNotFound(appointment_type_id));
        }

        let (day_start, day_end) = slots::day_bounds(date);
        let booked = self
            .store
            .booked_slots(appointment_type_id, day_start, day_end, auth_token)
            .await?;

        Ok(slots::grid_availability(date, &booked))
    }

    /// The caller may see an appointment when they are its patient, the
    /// doctor behind its type, or an admin.
    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .get_appointment(appointment_id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if actor.is_admin() || appointment.patient_id.to_string() == actor.id {
            return Ok(appointment);
        }

        if actor.is_doctor() && self.type_owner(&appointment, auth_token).await?.as_deref() == Some(actor.id.as_str()) {
            return Ok(appointment);
        }

        Err(AppointmentError::Unauthorized(format!(
            "Not allowed to view appointment {}",
            appointment_id
        )))
    }

    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_patient(patient_id, auth_token).await
    }

    /// Every appointment on `date` across the doctor's appointment types.
    pub async fn doctor_schedule(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let type_ids = self
            .store
            .appointment_type_ids_for_doctor(doctor_id, auth_token)
            .await?;
        if type_ids.is_empty() {
            debug!("Doctor {} has no appointment types", doctor_id);
            return Ok(Vec::new());
        }

        let (day_start, day_end) = slots::day_bounds(date);
        self.store
            .list_for_types_between(&type_ids, day_start, day_end, auth_token)
            .await
    }

    pub async fn cancel(
        &self,
        appointment_id: i64,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, AppointmentStatus::Cancelled, auth_token).await
    }

    pub async fn complete(
        &self,
        appointment_id: i64,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, AppointmentStatus::Completed, auth_token).await
    }

    async fn transition(
        &self,
        appointment_id: i64,
        actor: &User,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .get_appointment(appointment_id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let owner = self.type_owner(&appointment, auth_token).await?;
        self.lifecycle_service
            .authorize_transition(actor, &appointment, owner.as_deref(), new_status)?;
        self.lifecycle_service
            .validate_status_transition(appointment.status, new_status)?;

        let updated = self
            .store
            .transition_status(appointment_id, appointment.status, new_status, auth_token)
            .await?;

        match updated {
            Some(updated) => {
                info!("Appointment {} moved to {}", appointment_id, new_status);
                Ok(updated)
            }
            None => {
                // Lost a race with another transition; report what it became.
                let current = self
                    .store
                    .get_appointment(appointment_id, auth_token)
                    .await?
                    .ok_or(AppointmentError::NotFound)?;
                warn!(
                    "Appointment {} changed to {} before it could move to {}",
                    appointment_id, current.status, new_status
                );
                Err(AppointmentError::InvalidStatusTransition {
                    from: current.status,
                    to: new_status,
                })
            }
        }
    }

    async fn type_owner(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Option<String>, AppointmentError> {
        if let Some(doctor_id) = appointment.appointment_type.as_ref().and_then(|t| t.doctor_id) {
            return Ok(Some(doctor_id.to_string()));
        }

        Ok(self
            .store
            .find_appointment_type(appointment.appointment_type_id, auth_token)
            .await?
            .map(|t| t.doctor_id.to_string()))
    }
}
