// File: crates/bookdesk_gcal/src/handlers.rs
use crate::logic::{
    availability_fetch_window, compute_slots, fetch_day_schedule, local_day, parse_date,
    parse_time_zone, resolve_live_hours, to_slot, AvailabilityQuery, AvailabilityResponse,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use bookdesk_common::{BookdeskError, DynCalendarService};
use bookdesk_config::AppConfig;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct GcalState {
    pub config: Arc<AppConfig>,
    pub calendar: DynCalendarService,
    pub calendar_id: String,
}

impl GcalState {
    pub fn new(config: Arc<AppConfig>, calendar: DynCalendarService) -> Self {
        let calendar_id = config
            .gcal
            .as_ref()
            .map(|g| g.calendar_id.clone())
            .unwrap_or_else(|| "primary".to_string());
        Self {
            config,
            calendar,
            calendar_id,
        }
    }
}

/// Handler to get bookable start times for one day.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Bookable start times for the day", body = AvailabilityResponse),
        (status = 400, description = "Missing or invalid date"),
        (status = 500, description = "Calendar unavailable")
    ),
    tag = "Availability"
))]
pub async fn get_availability_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, BookdeskError> {
    let rules = &state.config.scheduling;
    let date = parse_date(query.date.as_deref())?;
    let live_hours = resolve_live_hours(query.hours.as_deref(), rules);
    let tz_name = query
        .tz
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&rules.time_zone);
    let tz = parse_time_zone(tz_name)?;

    let day = local_day(date, tz)?;
    let fetch = availability_fetch_window(date, live_hours, tz, rules)?;
    let schedule = fetch_day_schedule(state.calendar.as_ref(), &state.calendar_id, day, fetch).await?;

    let slots = compute_slots(date, live_hours, &schedule, tz, rules, Utc::now())?;
    info!(
        "Availability for {} ({}h, {}): {} slots, {} bookings",
        date,
        live_hours,
        tz.name(),
        slots.len(),
        schedule.booked_count(None)
    );

    Ok(Json(AvailabilityResponse {
        ok: true,
        date: date.format("%Y-%m-%d").to_string(),
        live_hours,
        time_zone: tz.name().to_string(),
        slots: slots.into_iter().map(|s| to_slot(s, tz)).collect(),
    }))
}
