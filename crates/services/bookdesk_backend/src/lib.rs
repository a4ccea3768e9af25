// File: services/bookdesk_backend/src/lib.rs
pub mod app; // Router assembly, CORS and fallbacks
pub mod services; // External service connections

pub use app::{build_app, cors_layer};
pub use services::connect_calendar;
