pub mod booking;
pub mod lifecycle;
pub mod meeting;
pub mod memory;
pub mod slots;
pub mod store;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use meeting::MeetingLinkGenerator;
pub use memory::InMemoryAppointmentStore;
pub use store::{AppointmentStore, SupabaseAppointmentStore};
