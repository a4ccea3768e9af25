// --- File: crates/bookdesk_stripe/src/error.rs ---
use bookdesk_common::{
    config_error, internal_error, invalid_input, upstream_failure, BookdeskError, HttpStatusCode,
};
use bookdesk_fulfillment::FulfillmentError;
use thiserror::Error;

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Error occurred during a Stripe API request
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API
    #[error("{message}")]
    ApiError { status_code: u16, message: String },

    /// Error parsing a Stripe API response or webhook event
    #[error("Failed to parse Stripe payload: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or incomplete Stripe configuration
    #[error("{0}")]
    ConfigError(String),

    /// Webhook signature verification failed
    #[error("Stripe webhook signature verification failed: {0}")]
    WebhookSignatureError(String),

    #[error("Missing booking basics (pkg, mainBar, dateISO, startISO)")]
    MissingBookingBasics,

    #[error("Amount due now must be greater than zero")]
    NothingDue,

    #[error("Invalid hours: expected more than 0 and at most {max}")]
    InvalidHours { max: f64 },

    /// Booking reconciliation failed after a verified webhook
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    /// Internal processing error
    #[error("Internal processing error: {0}")]
    InternalError(String),
}

impl From<StripeError> for BookdeskError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestError(e) => upstream_failure("Stripe", e),
            StripeError::ApiError { message, .. } => upstream_failure("Stripe", message),
            StripeError::ParseError(e) => upstream_failure("Stripe", e),
            StripeError::ConfigError(msg) => config_error(msg),
            StripeError::WebhookSignatureError(msg) => BookdeskError::AuthError(msg),
            StripeError::MissingBookingBasics
            | StripeError::NothingDue
            | StripeError::InvalidHours { .. } => invalid_input(err),
            StripeError::Fulfillment(e) => e.into(),
            StripeError::InternalError(msg) => internal_error(msg),
        }
    }
}

impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::WebhookSignatureError(_)
            | StripeError::MissingBookingBasics
            | StripeError::NothingDue => 400,
            StripeError::Fulfillment(e) => match e {
                FulfillmentError::MissingFields(_) | FulfillmentError::InvalidBooking(_) => 400,
                _ => 500,
            },
            _ => 500,
        }
    }
}
