// --- File: crates/bookdesk_stripe/src/lib.rs ---

pub mod doc;
pub mod error;
pub mod handlers; // Axum handlers for Stripe
pub mod logic; // Signature verification, payment links, webhook dispatch
pub mod routes;


pub use error::StripeError;
pub use logic::{
    compute_due_now, create_checkout_session, prepare_payment_link, sign_payload,
    verify_stripe_signature, GenerateLinkResponse, PaymentLink, WebhookAck,
};
pub use routes::routes;
