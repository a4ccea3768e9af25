// --- File: crates/bookdesk_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Calendar domain types
pub mod services; // Service abstractions


pub use error::{
    config_error, internal_error, invalid_input, upstream_failure, BookdeskError, Context,
    HttpStatusCode,
};

pub use http::{client::HTTP_CLIENT, map_json_error, method_not_allowed, not_found, JsonBody};

pub use logging::{init, init_from_config, init_with_level, log_error};

pub use models::{
    CalendarEvent, CalendarEventResult, EventBody, EventStatus, TimeWindow, ORDER_ID_KEY,
};
pub use services::{BoxFuture, BoxedCalendar, BoxedError, CalendarService, DynCalendarService};
