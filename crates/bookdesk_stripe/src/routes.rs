// --- File: crates/bookdesk_stripe/src/routes.rs ---

use crate::handlers::{generate_link_handler, stripe_webhook_handler, StripeState};
use axum::{routing::post, Router};
use bookdesk_config::AppConfig;
use bookdesk_fulfillment::FulfillmentState;
use std::sync::Arc;

/// Creates a router containing the payment link and webhook routes.
pub fn routes(config: Arc<AppConfig>, booking: Option<Arc<FulfillmentState>>) -> Router {
    let state = Arc::new(StripeState { config, booking });
    Router::new()
        .route("/generate-link", post(generate_link_handler))
        .route("/stripe/webhook", post(stripe_webhook_handler))
        .with_state(state)
}
