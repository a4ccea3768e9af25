// --- File: crates/bookdesk_gcal/src/lib.rs ---
pub mod auth;
pub mod doc;
pub mod handlers;
pub mod logic;
#[cfg(test)]
mod logic_proptest;
pub mod routes;
pub mod service;
#[cfg(test)]
mod service_test;

pub use logic::{
    block_window, compute_slots, fetch_day_schedule, format_instant, local_day, parse_date,
    parse_instant, parse_time_zone, DaySchedule, GcalError,
};
pub use service::GoogleCalendarService;
