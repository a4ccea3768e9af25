// --- File: crates/bookdesk_stripe/src/doc.rs ---
#![cfg(feature = "openapi")]

use crate::logic::{GenerateLinkResponse, WebhookAck};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::generate_link_handler,
        crate::handlers::stripe_webhook_handler
    ),
    components(schemas(GenerateLinkResponse, WebhookAck)),
    tags(
        (name = "Stripe", description = "Payment links and checkout webhooks")
    )
)]
pub struct StripeApiDoc;
