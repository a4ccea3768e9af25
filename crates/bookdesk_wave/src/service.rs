// --- File: crates/bookdesk_wave/src/service.rs ---
use bookdesk_config::{InvoicingConfig, WaveConfig};
use chrono::NaiveDate;
use serde::Serialize;
use std::str::FromStr;
use tracing::info;

use crate::client::{BusinessSummary, Product, WaveClient};
use crate::error::WaveError;
use crate::logic::{draft_invoice, InvoiceRequest, InvoiceResponse};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Actions served by the `/wave` dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveAction {
    EnvCheck,
    Ping,
    SchemaCheck,
    ListBusinesses,
    ListProducts,
    CreateInvoice,
}

impl FromStr for WaveAction {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env-check" => Ok(WaveAction::EnvCheck),
            "ping" => Ok(WaveAction::Ping),
            "schema-check" => Ok(WaveAction::SchemaCheck),
            "list-businesses" => Ok(WaveAction::ListBusinesses),
            "list-products" => Ok(WaveAction::ListProducts),
            "create-invoice" => Ok(WaveAction::CreateInvoice),
            other => Err(WaveError::InvalidInput(format!("Unknown action '{}'", other))),
        }
    }
}

pub const ACTION_HINT: &str =
    "GET: ?action=env-check|ping|schema-check|list-businesses|list-products  POST: action=create-invoice";

// --- Responses ---

/// Which settings are present. Values are never echoed.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EnvReport {
    pub token: bool,
    pub business_id: bool,
    pub currency: bool,
    pub product_id_service: bool,
    pub product_id_addon: bool,
    pub product_id_tax: bool,
    pub tax_rate: bool,
    pub tax_applies: bool,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EnvCheckResponse {
    pub ok: bool,
    pub report: EnvReport,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BusinessResponse {
    pub ok: bool,
    pub business: Option<BusinessSummary>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BusinessesResponse {
    pub ok: bool,
    pub businesses: Vec<BusinessSummary>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ProductsResponse {
    pub ok: bool,
    pub business: Option<String>,
    pub products: Vec<Product>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct HintResponse {
    pub ok: bool,
    pub hint: String,
}

impl Default for HintResponse {
    fn default() -> Self {
        Self {
            ok: true,
            hint: ACTION_HINT.to_string(),
        }
    }
}

// --- Operations ---

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

pub fn env_report(wave: Option<&WaveConfig>, invoicing: &InvoicingConfig) -> EnvReport {
    EnvReport {
        token: wave.is_some_and(|w| present(&w.token)),
        business_id: wave.is_some_and(|w| present(&w.business_id)),
        currency: wave.is_some_and(|w| !w.currency.trim().is_empty()),
        product_id_service: wave.is_some_and(|w| present(&w.product_id_service)),
        product_id_addon: wave.is_some_and(|w| present(&w.product_id_addon)),
        product_id_tax: wave.is_some_and(|w| present(&w.product_id_tax)),
        tax_rate: invoicing.tax_rate > 0.0,
        tax_applies: true,
    }
}

/// Token and business id, both required for business-scoped calls.
pub fn business_client(wave: &WaveConfig) -> Result<(WaveClient, &str), WaveError> {
    let business_id = wave.business_id.as_deref().filter(|b| !b.is_empty());
    match (WaveClient::from_config(wave), business_id) {
        (Ok(client), Some(business_id)) => Ok((client, business_id)),
        _ => Err(WaveError::ConfigError(
            "Wave not configured (token / business_id missing)".to_string(),
        )),
    }
}

/// Finds the customer by email, or creates one, then creates and approves
/// the invoice.
pub async fn create_invoice(
    wave: &WaveConfig,
    invoicing: &InvoicingConfig,
    request: &InvoiceRequest,
    today: NaiveDate,
) -> Result<InvoiceResponse, WaveError> {
    let (client, business_id) = business_client(wave)?;
    let draft = draft_invoice(request, wave, invoicing, today)?;

    let existing = match request.email() {
        Some(email) => client.find_customer(business_id, email).await?,
        None => None,
    };
    let customer_id = match existing {
        Some(id) => id,
        None => {
            let name = request
                .full_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or("Booking Client");
            let phone = request.phone.as_deref().filter(|p| !p.trim().is_empty());
            client
                .create_customer(business_id, name, request.email(), phone)
                .await?
        }
    };

    let totals = draft.totals;
    let input = draft.into_input(business_id, &customer_id, &wave.currency);
    let invoice = client.create_invoice(&input).await?;
    client.approve_invoice(business_id, &invoice.id).await?;
    info!("Wave invoice {} created and approved for customer {}", invoice.id, customer_id);

    Ok(InvoiceResponse {
        ok: true,
        invoice_id: invoice.id,
        view_url: invoice.view_url,
        pdf_url: invoice.pdf_url,
        totals: totals.into(),
    })
}

pub async fn ping(wave: &WaveConfig) -> Result<BusinessResponse, WaveError> {
    let (client, business_id) = business_client(wave)?;
    let business = client.ping(business_id).await?;
    Ok(BusinessResponse { ok: true, business })
}

pub async fn schema_check(wave: &WaveConfig) -> Result<BusinessResponse, WaveError> {
    let (client, business_id) = business_client(wave)?;
    let business = client.schema_check(business_id).await?;
    Ok(BusinessResponse { ok: true, business })
}

pub async fn list_businesses(wave: &WaveConfig) -> Result<BusinessesResponse, WaveError> {
    let client = WaveClient::from_config(wave)?;
    let businesses = client.list_businesses().await?;
    Ok(BusinessesResponse {
        ok: true,
        businesses,
    })
}

pub async fn list_products(wave: &WaveConfig) -> Result<ProductsResponse, WaveError> {
    let (client, business_id) = business_client(wave)?;
    let (business, products) = client.list_products(business_id).await?;
    Ok(ProductsResponse {
        ok: true,
        business,
        products,
    })
}
