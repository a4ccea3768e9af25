// --- File: crates/bookdesk_gcal/src/routes.rs ---

use crate::handlers::{get_availability_handler, GcalState};
use axum::{routing::get, Router};
use bookdesk_common::DynCalendarService;
use bookdesk_config::AppConfig;
use std::sync::Arc;

/// Routes for the availability feature, relative to `/api`.
pub fn routes(config: Arc<AppConfig>, calendar: DynCalendarService) -> Router {
    let gcal_state = Arc::new(GcalState::new(config, calendar));

    Router::new()
        .route("/availability", get(get_availability_handler))
        .with_state(gcal_state)
}
