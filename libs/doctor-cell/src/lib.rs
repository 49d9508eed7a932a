pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{AppointmentType, Doctor, DoctorError, RegisterDoctorRequest, RegisteredDoctor};
pub use router::doctor_routes;
