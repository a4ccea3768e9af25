// --- File: crates/bookdesk_wave/src/routes.rs ---

use crate::handlers::{
    create_invoice_handler, env_check_handler, list_businesses_handler, list_products_handler,
    ping_handler, schema_check_handler, wave_get_handler, wave_post_handler, WaveState,
};
use axum::{
    routing::{get, post},
    Router,
};
use bookdesk_config::AppConfig;
use std::sync::Arc;

/// Creates a router containing the invoicing and diagnostic routes.
pub fn routes(config: Arc<AppConfig>) -> Router {
    let state = Arc::new(WaveState { config });
    Router::new()
        .route("/wave", get(wave_get_handler).post(wave_post_handler))
        .route("/wave/create-invoice", post(create_invoice_handler))
        .route("/wave/env-check", get(env_check_handler))
        .route("/wave/ping", get(ping_handler))
        .route("/wave/schema-check", get(schema_check_handler))
        .route("/wave/list-businesses", get(list_businesses_handler))
        .route("/wave/list-products", get(list_products_handler))
        .with_state(state)
}
