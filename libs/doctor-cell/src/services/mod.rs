pub mod catalog;
pub mod pricing;
pub mod registration;

pub use catalog::AppointmentTypeCatalog;
pub use registration::DoctorRegistrationService;
