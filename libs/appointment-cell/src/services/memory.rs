// libs/appointment-cell/src/services/memory.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::AppointmentType;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentTypeSummary, BookedSlot,
    NewAppointment, SlotWindow,
};
use crate::services::store::AppointmentStore;

#[derive(Default)]
struct Tables {
    types: BTreeMap<i64, AppointmentType>,
    appointments: BTreeMap<i64, Appointment>,
    next_id: i64,
}

impl Tables {
    fn with_type_summary(&self, mut appointment: Appointment) -> Appointment {
        appointment.appointment_type = self.types.get(&appointment.appointment_type_id).map(|t| {
            AppointmentTypeSummary {
                name: t.name.clone(),
                duration: Some(t.duration),
                price: Some(t.price),
                doctor_id: Some(t.doctor_id),
                doctor_name: Some(t.doctor_name.clone()),
                doctor_specialization: t.doctor_specialization.clone(),
            }
        });
        appointment
    }

    fn conflicts(&self, type_id: i64, window: &SlotWindow) -> impl Iterator<Item = &Appointment> {
        let window = *window;
        self.appointments.values().filter(move |a| {
            a.appointment_type_id == type_id && a.is_upcoming() && a.slot().overlaps(&window)
        })
    }
}

/// Process-local store. The check and the insert share one lock, which is
/// what the exclusion constraint gives the hosted database.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    tables: Mutex<Tables>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(types: impl IntoIterator<Item = AppointmentType>) -> Self {
        let tables = Tables {
            types: types.into_iter().map(|t| (t.id, t)).collect(),
            ..Tables::default()
        };
        Self { tables: Mutex::new(tables) }
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.tables.lock().await.appointments.values().cloned().collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_appointment_type(
        &self,
        type_id: i64,
        _auth_token: &str,
    ) -> Result<Option<AppointmentType>, AppointmentError> {
        Ok(self.tables.lock().await.types.get(&type_id).cloned())
    }

    async fn appointment_type_ids_for_doctor(
        &self,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<i64>, AppointmentError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .types
            .values()
            .filter(|t| t.doctor_id == doctor_id)
            .map(|t| t.id)
            .collect())
    }

    async fn booked_slots(
        &self,
        type_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        let tables = self.tables.lock().await;
        let mut slots: Vec<BookedSlot> = tables
            .appointments
            .values()
            .filter(|a| a.appointment_type_id == type_id && a.is_upcoming())
            .filter(|a| a.start_time >= from && a.start_time < to)
            .map(Appointment::booked_slot)
            .collect();
        slots.sort_by_key(|b| b.start_time);
        Ok(slots)
    }

    async fn find_conflicting(
        &self,
        type_id: i64,
        window: SlotWindow,
        _auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        let tables = self.tables.lock().await;
        Ok(tables.conflicts(type_id, &window).map(Appointment::booked_slot).collect())
    }

    async fn insert_if_free(
        &self,
        appointment: NewAppointment,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut tables = self.tables.lock().await;

        if !tables.types.contains_key(&appointment.appointment_type_id) {
            return Err(AppointmentError::ValidationError(
                "Appointment references an unknown patient or type".to_string(),
            ));
        }

        let window = SlotWindow::starting_at(appointment.start_time);
        if appointment.status == AppointmentStatus::Upcoming
            && tables.conflicts(appointment.appointment_type_id, &window).next().is_some()
        {
            debug!("Slot {} for type {} already taken", appointment.start_time, appointment.appointment_type_id);
            return Err(AppointmentError::SlotConflict);
        }

        tables.next_id += 1;
        let stored = Appointment {
            id: tables.next_id,
            patient_id: appointment.patient_id,
            appointment_type_id: appointment.appointment_type_id,
            start_time: appointment.start_time,
            status: appointment.status,
            notes: appointment.notes,
            location: appointment.location,
            meeting_url: appointment.meeting_url,
            appointment_type: None,
            patient: None,
        };
        tables.appointments.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn get_appointment(
        &self,
        appointment_id: i64,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .appointments
            .get(&appointment_id)
            .cloned()
            .map(|a| tables.with_type_summary(a)))
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let mut tables = self.tables.lock().await;
        match tables.appointments.get_mut(&appointment_id) {
            Some(appointment) if appointment.status == from => {
                appointment.status = to;
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .map(|a| tables.with_type_summary(a))
            .collect();
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(rows)
    }

    async fn list_for_types_between(
        &self,
        type_ids: &[i64],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| type_ids.contains(&a.appointment_type_id))
            .filter(|a| a.start_time >= from && a.start_time < to)
            .cloned()
            .map(|a| tables.with_type_summary(a))
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(rows)
    }
}
