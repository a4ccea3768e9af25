// --- File: crates/bookdesk_fulfillment/src/doc.rs ---
#![cfg(feature = "openapi")]

use crate::logic::ManualBookingResponse;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(crate::handlers::create_booking_handler),
    components(schemas(ManualBookingResponse)),
    tags(
        (name = "Bookings", description = "Manual manager bookings")
    )
)]
pub struct FulfillmentApiDoc;
