// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::DoctorError;

/// Location label that turns a booking into a remote consultation.
pub const VIDEO_CONSULTATION: &str = "Video Consultation";
pub const MAIN_CLINIC: &str = "Main Clinic";

/// Width of one bookable slot.
pub const SLOT_MINUTES: i64 = 30;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Upcoming => "upcoming",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Upcoming)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment type fields embedded in listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentTypeSummary {
    pub name: String,
    pub duration: Option<i32>,
    pub price: Option<f64>,
    pub doctor_id: Option<Uuid>,
    pub doctor_name: Option<String>,
    pub doctor_specialization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: Uuid,
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub location: String,
    pub meeting_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentTypeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
}

impl Appointment {
    pub fn slot(&self) -> SlotWindow {
        SlotWindow::starting_at(self.start_time)
    }

    pub fn is_upcoming(&self) -> bool {
        self.status == AppointmentStatus::Upcoming
    }

    pub fn booked_slot(&self) -> BookedSlot {
        BookedSlot {
            appointment_type_id: self.appointment_type_id,
            start_time: self.start_time,
        }
    }
}

/// Row written by the reservation check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub location: String,
    pub meeting_url: Option<String>,
}

/// Occupancy of one upcoming booking. This is all the availability lookup
/// exposes about other patients' appointments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookedSlot {
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
}

impl BookedSlot {
    pub fn slot(&self) -> SlotWindow {
        SlotWindow::starting_at(self.start_time)
    }
}

/// Half-open interval `[start, end)` occupied by one booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotWindow {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + Duration::minutes(SLOT_MINUTES),
        }
    }

    pub fn overlaps(&self, other: &SlotWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Any slot starting strictly after this instant and before `end` overlaps the window.
    pub fn earliest_conflicting_start(&self) -> DateTime<Utc> {
        self.start - Duration::minutes(SLOT_MINUTES)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveSlotRequest {
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    pub patient_id: Uuid,
    pub location: String,
    pub notes: Option<String>,
}

/// Body of `POST /appointments`. The patient defaults to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    pub location: String,
    pub notes: Option<String>,
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub appointment_type_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotAvailability {
    /// `HH:MM`, UTC.
    pub time: String,
    pub start_time: DateTime<Utc>,
    pub available: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment type {0} not found")]
    AppointmentTypeNotFound(i64),

    #[error("This time slot is already booked")]
    SlotConflict,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::AppointmentTypeNotFound(id) => AppointmentError::AppointmentTypeNotFound(id),
            DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
