// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Upcoming is the only state with exits; completed and cancelled are final.
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Upcoming => vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Who may move an appointment to `new_status`. `type_owner` is the doctor
    /// behind the appointment's type.
    pub fn authorize_transition(
        &self,
        actor: &User,
        appointment: &Appointment,
        type_owner: Option<&str>,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if actor.is_admin() {
            return Ok(());
        }

        let is_owning_doctor = actor.is_doctor() && type_owner == Some(actor.id.as_str());
        let is_patient = appointment.patient_id.to_string() == actor.id;

        let allowed = match new_status {
            AppointmentStatus::Cancelled => is_patient || is_owning_doctor,
            AppointmentStatus::Completed => is_owning_doctor,
            AppointmentStatus::Upcoming => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(AppointmentError::Unauthorized(format!(
                "Not allowed to mark appointment {} as {}",
                appointment.id, new_status
            )))
        }
    }
}
