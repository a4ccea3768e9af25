// --- File: crates/bookdesk_fulfillment/src/lib.rs ---

pub mod doc;
pub mod handlers; // Axum handlers for manual bookings
pub mod logic; // Reconciliation, canonical event payload
pub mod routes;

#[cfg(test)]
mod logic_test;

pub use handlers::FulfillmentState;
pub use logic::{
    flatten_payload, flatten_value, BookingFields, BookingMetadata, BookingSettings,
    FulfillmentError, ReconcileOutcome, SkipReason,
};
pub use routes::{fulfillment_state, routes};
