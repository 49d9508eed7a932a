pub mod events;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use events::{AuthEvent, SessionEvents};
pub use models::{AuthError, Session};
pub use router::auth_routes;
