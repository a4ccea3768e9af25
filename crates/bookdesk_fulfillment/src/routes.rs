// --- File: crates/bookdesk_fulfillment/src/routes.rs ---

use crate::handlers::{create_booking_handler, FulfillmentState};
use crate::logic::{BookingSettings, FulfillmentError};
use axum::{routing::post, Router};
use bookdesk_common::DynCalendarService;
use bookdesk_config::AppConfig;
use std::sync::Arc;

/// Builds the shared booking state from configuration.
pub fn fulfillment_state(
    config: &AppConfig,
    calendar: DynCalendarService,
) -> Result<Arc<FulfillmentState>, FulfillmentError> {
    let settings = BookingSettings::from_config(config)?;
    Ok(Arc::new(FulfillmentState::new(settings, calendar)))
}

/// Creates a router containing the manual booking route.
pub fn routes(state: Arc<FulfillmentState>) -> Router {
    Router::new()
        .route("/create-booking", post(create_booking_handler))
        .with_state(state)
}
