// --- File: crates/bookdesk_wave/src/lib.rs ---

pub mod client; // Wave GraphQL client
pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic; // Invoice totals and payload
pub mod routes;
pub mod service; // Create-invoice flow and diagnostics

#[cfg(test)]
mod logic_proptest;

pub use client::{join_input_errors, WaveClient};
pub use error::WaveError;
pub use logic::{compute_totals, draft_invoice, format_cents, InvoiceRequest, InvoiceTotals};
pub use routes::routes;
pub use service::{create_invoice, env_report, WaveAction};
