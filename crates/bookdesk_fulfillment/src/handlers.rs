// --- File: crates/bookdesk_fulfillment/src/handlers.rs ---

use axum::{extract::State, response::Json};
use bookdesk_common::{invalid_input, BookdeskError, DynCalendarService, JsonBody};
use serde_json::Value;
use std::sync::Arc;

use crate::logic::{
    create_manual_booking, flatten_payload, reconcile, BookingFields, BookingSettings,
    FulfillmentError, ManualBookingResponse, ReconcileOutcome,
};

// --- State for Fulfillment Handlers ---
#[derive(Clone)]
pub struct FulfillmentState {
    pub settings: BookingSettings,
    pub calendar: DynCalendarService,
}

impl FulfillmentState {
    pub fn new(settings: BookingSettings, calendar: DynCalendarService) -> Self {
        Self { settings, calendar }
    }

    /// Reconciles a paid checkout session against the shared calendar.
    pub async fn reconcile(
        &self,
        session_id: &str,
        fields: &BookingFields,
    ) -> Result<ReconcileOutcome, FulfillmentError> {
        reconcile(self.calendar.as_ref(), &self.settings, session_id, fields).await
    }
}

/// Handler for manual bookings entered in the manager UI.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/create-booking",
    request_body(content = Object, description = "Booking fields as sent by the manager UI", example = json!({
        "fullName": "Ana Ruiz",
        "email": "ana@example.com",
        "dateISO": "2025-06-14",
        "startISO": "2025-06-14T23:00:00.000Z",
        "pkg": "150-250-5h",
        "mainBar": "Mimosa Bar",
        "venue": "Rose Garden",
        "total": 650,
        "payMode": "deposit"
    })),
    responses(
        (status = 200, description = "Booking created, or refused for capacity/overlap", body = ManualBookingResponse),
        (status = 400, description = "Missing fields (fullName, dateISO, startISO, pkg, mainBar)"),
        (status = 500, description = "Calendar write failed")
    ),
    tag = "Bookings"
))]
pub async fn create_booking_handler(
    State(state): State<Arc<FulfillmentState>>,
    JsonBody(payload): JsonBody<Value>,
) -> Result<Json<ManualBookingResponse>, BookdeskError> {
    let Value::Object(payload) = payload else {
        return Err(invalid_input("Request body must be a JSON object"));
    };
    let metadata = flatten_payload(&payload);
    let outcome = create_manual_booking(state.calendar.as_ref(), &state.settings, &metadata).await?;
    Ok(Json(ManualBookingResponse::from(outcome)))
}
