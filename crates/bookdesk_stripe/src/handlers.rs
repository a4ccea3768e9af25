// --- File: crates/bookdesk_stripe/src/handlers.rs ---
use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};
use bookdesk_common::{invalid_input, BookdeskError, JsonBody};
use bookdesk_config::{AppConfig, StripeConfig};
use bookdesk_fulfillment::FulfillmentState;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::StripeError;
use crate::logic::{
    create_checkout_session, prepare_payment_link, process_stripe_event, verify_stripe_signature,
    GenerateLinkResponse, StripeEvent, WebhookAck,
};

// --- State for Stripe Handlers ---
// reqwest::Client is static in bookdesk_common
#[derive(Clone)]
pub struct StripeState {
    pub config: Arc<AppConfig>,
    /// Present when the calendar is configured; the webhook reconciles into it.
    pub booking: Option<Arc<FulfillmentState>>,
}

impl StripeState {
    fn stripe(&self) -> Result<&StripeConfig, StripeError> {
        self.config
            .stripe
            .as_ref()
            .ok_or_else(|| StripeError::ConfigError("Stripe configuration not loaded".to_string()))
    }
}

/// Axum handler to create a manager payment link (Stripe Checkout Session).
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/generate-link",
    request_body(content = Object, description = "Booking basics and pricing", example = json!({
        "pkg": "150-250-5h",
        "mainBar": "Mimosa Bar",
        "dateISO": "2025-06-14",
        "startISO": "2025-06-14T23:00:00.000Z",
        "total": 650,
        "deposit": 100,
        "payMode": "deposit",
        "fullName": "Ana Ruiz",
        "addons": ["Champagne Tower", "Neon Sign"]
    })),
    responses(
        (status = 200, description = "Checkout Session created", body = GenerateLinkResponse),
        (status = 400, description = "Missing booking basics or nothing due"),
        (status = 500, description = "Stripe API error or missing configuration")
    ),
    tag = "Stripe"
))]
pub async fn generate_link_handler(
    State(state): State<Arc<StripeState>>,
    JsonBody(payload): JsonBody<Value>,
) -> Result<Json<GenerateLinkResponse>, BookdeskError> {
    let stripe = state.stripe()?;
    let Value::Object(payload) = payload else {
        return Err(invalid_input("Request body must be a JSON object"));
    };
    let link = prepare_payment_link(&payload, stripe, &state.config.scheduling)?;
    let response = create_checkout_session(stripe, &link).await?;
    Ok(Json(response))
}

/// Axum handler for Stripe webhook deliveries.
///
/// Reads the raw body so the signature is checked against the exact bytes
/// Stripe signed.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/stripe/webhook",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Signature verification failed"),
        (status = 500, description = "Calendar failure or missing configuration")
    ),
    tag = "Stripe"
))]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<StripeState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, BookdeskError> {
    let stripe = state.stripe()?;
    let secret = stripe
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StripeError::ConfigError("Missing STRIPE_WEBHOOK_SECRET".to_string()))?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok());
    verify_stripe_signature(
        body.as_bytes(),
        signature,
        secret,
        stripe.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event: StripeEvent = serde_json::from_str(&body)
        .map_err(|e| invalid_input(format!("Invalid Stripe event: {}", e)))?;
    let ack = process_stripe_event(event, state.booking.as_deref()).await?;
    info!("Stripe webhook acknowledged: {:?}", ack);
    Ok(Json(ack))
}
