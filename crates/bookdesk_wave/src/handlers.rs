// --- File: crates/bookdesk_wave/src/handlers.rs ---
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use bookdesk_common::{BookdeskError, JsonBody};
use bookdesk_config::{AppConfig, WaveConfig};
use chrono::Utc;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;

use crate::error::WaveError;
use crate::logic::InvoiceRequest;
use crate::service::{self, env_report, EnvCheckResponse, HintResponse, WaveAction};

#[cfg(feature = "openapi")]
use crate::logic::InvoiceResponse;
#[cfg(feature = "openapi")]
use crate::service::{BusinessResponse, BusinessesResponse, ProductsResponse};

// --- State for Wave Handlers ---
#[derive(Clone)]
pub struct WaveState {
    pub config: Arc<AppConfig>,
}

impl WaveState {
    fn wave(&self) -> Cow<'_, WaveConfig> {
        match self.config.wave.as_ref() {
            Some(wave) => Cow::Borrowed(wave),
            None => Cow::Owned(WaveConfig::default()),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ActionQuery {
    /// env-check, ping, schema-check, list-businesses, list-products or create-invoice
    pub action: Option<String>,
}

async fn run_diagnostic(state: &WaveState, action: WaveAction) -> Result<Response, WaveError> {
    let wave = state.wave();
    Ok(match action {
        WaveAction::EnvCheck => Json(EnvCheckResponse {
            ok: true,
            report: env_report(state.config.wave.as_ref(), &state.config.invoicing),
        })
        .into_response(),
        WaveAction::Ping => Json(service::ping(&wave).await?).into_response(),
        WaveAction::SchemaCheck => Json(service::schema_check(&wave).await?).into_response(),
        WaveAction::ListBusinesses => Json(service::list_businesses(&wave).await?).into_response(),
        WaveAction::ListProducts => Json(service::list_products(&wave).await?).into_response(),
        WaveAction::CreateInvoice => Json(HintResponse::default()).into_response(),
    })
}

async fn run_create_invoice(state: &WaveState, request: &InvoiceRequest) -> Result<Response, WaveError> {
    let today = Utc::now().date_naive();
    let response =
        service::create_invoice(&state.wave(), &state.config.invoicing, request, today).await?;
    Ok(Json(response).into_response())
}

/// `GET /wave?action=...` diagnostics. A missing or unknown action answers
/// with a usage hint.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/wave",
    params(ActionQuery),
    responses(
        (status = 200, description = "Diagnostic result or usage hint"),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn wave_get_handler(
    State(state): State<Arc<WaveState>>,
    Query(query): Query<ActionQuery>,
) -> Result<Response, BookdeskError> {
    match query.action.as_deref().map(str::parse::<WaveAction>) {
        Some(Ok(action)) => Ok(run_diagnostic(&state, action).await?),
        _ => Ok(Json(HintResponse::default()).into_response()),
    }
}

/// `POST /wave`: creates an invoice when the action (query or body) is
/// `create-invoice` or absent.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/wave",
    params(ActionQuery),
    request_body = InvoiceRequest,
    responses(
        (status = 200, description = "Invoice created and approved", body = InvoiceResponse),
        (status = 400, description = "Unknown action for POST"),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn wave_post_handler(
    State(state): State<Arc<WaveState>>,
    Query(query): Query<ActionQuery>,
    JsonBody(request): JsonBody<InvoiceRequest>,
) -> Result<Response, BookdeskError> {
    let action = query
        .action
        .clone()
        .or_else(|| request.action.clone())
        .filter(|a| !a.trim().is_empty());
    match action.as_deref().map(str::parse::<WaveAction>) {
        None | Some(Ok(WaveAction::CreateInvoice)) => Ok(run_create_invoice(&state, &request).await?),
        Some(_) => Err(WaveError::InvalidInput("Unknown action for POST".to_string()).into()),
    }
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/wave/create-invoice",
    request_body = InvoiceRequest,
    responses(
        (status = 200, description = "Invoice created and approved", body = InvoiceResponse),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn create_invoice_handler(
    State(state): State<Arc<WaveState>>,
    JsonBody(request): JsonBody<InvoiceRequest>,
) -> Result<Response, BookdeskError> {
    Ok(run_create_invoice(&state, &request).await?)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/wave/env-check",
    responses((status = 200, description = "Presence of each Wave setting", body = EnvCheckResponse)),
    tag = "Wave"
))]
pub async fn env_check_handler(State(state): State<Arc<WaveState>>) -> Result<Response, BookdeskError> {
    Ok(run_diagnostic(&state, WaveAction::EnvCheck).await?)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/wave/ping",
    responses(
        (status = 200, description = "Configured business", body = BusinessResponse),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn ping_handler(State(state): State<Arc<WaveState>>) -> Result<Response, BookdeskError> {
    Ok(run_diagnostic(&state, WaveAction::Ping).await?)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/wave/schema-check",
    responses(
        (status = 200, description = "Configured business", body = BusinessResponse),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn schema_check_handler(State(state): State<Arc<WaveState>>) -> Result<Response, BookdeskError> {
    Ok(run_diagnostic(&state, WaveAction::SchemaCheck).await?)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/wave/list-businesses",
    responses(
        (status = 200, description = "Businesses visible to the token", body = BusinessesResponse),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn list_businesses_handler(State(state): State<Arc<WaveState>>) -> Result<Response, BookdeskError> {
    Ok(run_diagnostic(&state, WaveAction::ListBusinesses).await?)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/wave/list-products",
    responses(
        (status = 200, description = "Products of the configured business", body = ProductsResponse),
        (status = 500, description = "Wave not configured or Wave error")
    ),
    tag = "Wave"
))]
pub async fn list_products_handler(State(state): State<Arc<WaveState>>) -> Result<Response, BookdeskError> {
    Ok(run_diagnostic(&state, WaveAction::ListProducts).await?)
}
