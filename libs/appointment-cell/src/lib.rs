pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, AppointmentError, AppointmentStatus, ReserveSlotRequest};
pub use router::appointment_routes;
pub use services::booking::AppointmentBookingService;
pub use services::memory::InMemoryAppointmentStore;
pub use services::store::{AppointmentStore, SupabaseAppointmentStore};
