// --- File: crates/bookdesk_wave/src/doc.rs ---
#![cfg(feature = "openapi")]

use crate::client::{BusinessSummary, Product};
use crate::logic::{InvoiceRequest, InvoiceResponse, TotalsView};
use crate::service::{
    BusinessResponse, BusinessesResponse, EnvCheckResponse, EnvReport, HintResponse,
    ProductsResponse,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::wave_get_handler,
        crate::handlers::wave_post_handler,
        crate::handlers::create_invoice_handler,
        crate::handlers::env_check_handler,
        crate::handlers::ping_handler,
        crate::handlers::schema_check_handler,
        crate::handlers::list_businesses_handler,
        crate::handlers::list_products_handler
    ),
    components(schemas(
        InvoiceRequest,
        InvoiceResponse,
        TotalsView,
        EnvReport,
        EnvCheckResponse,
        BusinessSummary,
        BusinessResponse,
        BusinessesResponse,
        Product,
        ProductsResponse,
        HintResponse
    )),
    tags(
        (name = "Wave", description = "Invoicing and Wave diagnostics")
    )
)]
pub struct WaveApiDoc;
