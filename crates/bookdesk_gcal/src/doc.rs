// File: crates/bookdesk_gcal/src/doc.rs
#![cfg(feature = "openapi")]

use crate::logic::{AvailabilityResponse, Slot};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(crate::handlers::get_availability_handler),
    components(schemas(AvailabilityResponse, Slot)),
    tags(
        (name = "Availability", description = "Bookable start times from the shared calendar")
    ),
    servers(
        (url = "/api", description = "Bookdesk API server")
    )
)]
pub struct GcalApiDoc;
