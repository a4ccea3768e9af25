// --- File: crates/bookdesk_fulfillment/src/logic.rs ---
//! Booking Reconciliation: turns a paid checkout (or a manual manager
//! booking) into exactly one calendar event.
//!
//! Each call reads the day's events, checks capacity and overlap, then writes.
//! Nothing serializes concurrent calls: two deliveries for different sessions
//! that read the same day before either writes can both pass the checks and
//! both insert. The calendar API offers no conditional insert to close that
//! window, so it is kept short instead (one list, one write).

use bookdesk_common::{
    config_error, invalid_input, upstream_failure, BookdeskError, CalendarService, EventBody,
    TimeWindow, ORDER_ID_KEY,
};
use bookdesk_config::{AppConfig, SchedulingConfig};
use bookdesk_gcal::logic::{
    block_window, fetch_day_schedule, local_day, parse_instant, parse_time_zone, DaySchedule,
    GcalError,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Flat string key/value pairs, as carried in payment session metadata.
pub type BookingMetadata = BTreeMap<String, String>;

// --- Error Handling for Fulfillment ---
#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("Missing fields ({0})")]
    MissingFields(String),

    #[error("{0}")]
    InvalidBooking(String),

    #[error("{0}")]
    Calendar(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<GcalError> for FulfillmentError {
    fn from(err: GcalError) -> Self {
        match err {
            GcalError::Calendar(message) => FulfillmentError::Calendar(message),
            other => FulfillmentError::InvalidBooking(other.to_string()),
        }
    }
}

impl From<FulfillmentError> for BookdeskError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::MissingFields(_) | FulfillmentError::InvalidBooking(_) => {
                invalid_input(err)
            }
            FulfillmentError::Calendar(message) => upstream_failure("Google Calendar", message),
            FulfillmentError::ConfigError(message) => config_error(message),
        }
    }
}

// --- Settings ---

/// The slice of configuration booking writes depend on, resolved once at
/// startup.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub calendar_id: String,
    pub time_zone: Tz,
    pub color_id: Option<String>,
    pub rules: SchedulingConfig,
}

impl BookingSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, FulfillmentError> {
        let time_zone = parse_time_zone(&config.scheduling.time_zone)
            .map_err(|e| FulfillmentError::ConfigError(e.to_string()))?;
        let gcal = config.gcal.clone().unwrap_or_default();
        Ok(Self {
            calendar_id: gcal.calendar_id,
            time_zone,
            color_id: Some(gcal.event_color_id).filter(|c| !c.is_empty()),
            rules: config.scheduling.clone(),
        })
    }
}

// --- Metadata ---

/// Renders a JSON value as a metadata string: arrays joined with `,`,
/// objects as JSON, null as empty.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

pub fn flatten_payload(payload: &Map<String, Value>) -> BookingMetadata {
    payload
        .iter()
        .map(|(key, value)| (key.clone(), flatten_value(value)))
        .collect()
}

fn field(metadata: &BookingMetadata, key: &str) -> String {
    metadata.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn flag(metadata: &BookingMetadata, key: &str) -> bool {
    metadata
        .get(key)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// `2` for whole hours, `2.5` otherwise.
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.0}", hours)
    } else {
        hours.to_string()
    }
}

fn format_money(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => format!("{:.2}", amount),
        _ if raw.trim().is_empty() => "0.00".to_string(),
        _ => raw.trim().to_string(),
    }
}

// --- Booking Fields ---

/// Booking details as written to the calendar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFields {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub venue: String,
    pub pkg: String,
    pub main_bar: String,
    pub second_enabled: bool,
    pub second_bar: String,
    pub second_size: String,
    pub fountain_enabled: bool,
    pub fountain_size: String,
    pub fountain_type: String,
    pub addons: String,
    pub date_iso: String,
    pub start_iso: String,
    /// Parsed `start_iso`; `None` when absent or not RFC 3339.
    pub start: Option<DateTime<Utc>>,
    /// Explicit `hours` when positive, else the package's hours; `None` when
    /// the result exceeds `max_live_hours`.
    pub live_hours: Option<f64>,
    pub total: String,
    pub due_now: String,
    pub discount: String,
    pub pay_mode: String,
}

impl BookingFields {
    pub fn from_metadata(metadata: &BookingMetadata, rules: &SchedulingConfig) -> Self {
        let start_iso = field(metadata, "startISO");
        let pkg = field(metadata, "pkg");
        let explicit_hours = metadata
            .get("hours")
            .and_then(|h| h.trim().parse::<f64>().ok())
            .filter(|h| h.is_finite() && *h > 0.0);
        // An explicit duration over the maximum is not replaced by the package's.
        let live_hours = explicit_hours
            .or_else(|| Some(rules.package_hours(&pkg)))
            .filter(|h| rules.accepts_live_hours(*h));
        let main_bar = Some(field(metadata, "mainBar"))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Booking".to_string());

        Self {
            full_name: field(metadata, "fullName"),
            email: field(metadata, "email"),
            phone: field(metadata, "phone"),
            venue: field(metadata, "venue"),
            pkg,
            main_bar,
            second_enabled: flag(metadata, "secondEnabled"),
            second_bar: field(metadata, "secondBar"),
            second_size: field(metadata, "secondSize"),
            fountain_enabled: flag(metadata, "fountainEnabled"),
            fountain_size: field(metadata, "fountainSize"),
            fountain_type: field(metadata, "fountainType"),
            addons: field(metadata, "addons"),
            date_iso: field(metadata, "dateISO"),
            start: parse_instant(&start_iso).ok(),
            start_iso,
            live_hours,
            total: field(metadata, "total"),
            due_now: field(metadata, "dueNow"),
            discount: field(metadata, "discountApplied"),
            pay_mode: field(metadata, "payMode"),
        }
    }

    /// The start and duration, or `None` when either cannot be resolved.
    pub fn schedule(&self) -> Option<(DateTime<Utc>, f64)> {
        Some((self.start?, self.live_hours?))
    }
}

/// Where a booking came from; decides the description header and whether the
/// event is tagged for idempotent redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingSource<'a> {
    Checkout { session_id: &'a str },
    Manual,
}

impl BookingSource<'_> {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            BookingSource::Checkout { session_id } => Some(*session_id),
            BookingSource::Manual => None,
        }
    }

    fn header(&self) -> &'static str {
        match self {
            BookingSource::Checkout { .. } => "Manager Booking (Stripe)",
            BookingSource::Manual => "Manager Booking (Manual)",
        }
    }
}

pub fn build_description(fields: &BookingFields, live_hours: f64, source: BookingSource<'_>) -> String {
    let labelled = |label: &str, value: &str| {
        (!value.is_empty()).then(|| format!("{label}: {value}"))
    };
    let money = |label: &str, prefix: &str, value: &str| {
        (!value.is_empty()).then(|| format!("{label}: {prefix}${value}"))
    };

    let lines = [
        Some(source.header().to_string()),
        labelled("Name", &fields.full_name),
        labelled("Email", &fields.email),
        labelled("Phone", &fields.phone),
        labelled("Venue", &fields.venue),
        Some(format!("Package: {}", fields.pkg)),
        Some(format!("Main Bar: {}", fields.main_bar)),
        fields
            .second_enabled
            .then(|| format!("Second Bar: {} ({})", fields.second_bar, fields.second_size)),
        fields
            .fountain_enabled
            .then(|| format!("Fountain: {} ({})", fields.fountain_size, fields.fountain_type)),
        labelled("Add-ons", &fields.addons),
        Some(format!("Date: {}", fields.date_iso)),
        Some(format!("Start: {}", fields.start_iso)),
        Some(format!("Service hours: {}", format_hours(live_hours))),
        money("Discount", "-", &fields.discount),
        money("Total", "", &fields.total),
        money("Paid now", "", &fields.due_now),
        labelled("Pay mode", &fields.pay_mode),
        source.order_id().map(|id| format!("Stripe session: {id}")),
    ];
    lines.into_iter().flatten().collect::<Vec<_>>().join("\n")
}

/// Canonical event written for a booking, on insert and on update alike.
pub fn build_event_body(
    fields: &BookingFields,
    window: TimeWindow,
    live_hours: f64,
    source: BookingSource<'_>,
    settings: &BookingSettings,
) -> EventBody {
    let mut private_properties = BTreeMap::new();
    if let Some(order_id) = source.order_id() {
        private_properties.insert(ORDER_ID_KEY.to_string(), order_id.to_string());
    }
    let props = [
        ("source", "manager".to_string()),
        ("pkg", fields.pkg.clone()),
        ("mainBar", fields.main_bar.clone()),
        ("secondEnabled", fields.second_enabled.to_string()),
        ("secondBar", fields.second_bar.clone()),
        ("secondSize", fields.second_size.clone()),
        ("fountainEnabled", fields.fountain_enabled.to_string()),
        ("fountainSize", fields.fountain_size.clone()),
        ("fountainType", fields.fountain_type.clone()),
        ("addons", fields.addons.clone()),
        ("total", fields.total.clone()),
        ("dueNow", fields.due_now.clone()),
        ("discount", fields.discount.clone()),
        ("payMode", fields.pay_mode.clone()),
    ];
    for (key, value) in props {
        private_properties.insert(key.to_string(), value);
    }

    EventBody {
        summary: format!(
            "MANAGER - {} ({}) - ${}",
            fields.main_bar,
            fields.pkg,
            format_money(&fields.total)
        ),
        description: Some(build_description(fields, live_hours, source)),
        location: Some(fields.venue.clone()).filter(|v| !v.is_empty()),
        window,
        time_zone: settings.time_zone.name().to_string(),
        color_id: settings.color_id.clone(),
        private_properties,
        lock_guests: true,
    }
}

// --- Reconciliation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    MissingFields,
    Capacity,
    Overlap,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingFields => "missing-fields",
            SkipReason::Capacity => "capacity",
            SkipReason::Overlap => "overlap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created { event_id: String },
    Updated { event_id: String },
    Skipped(SkipReason),
}

/// The write a reconciliation will perform against a schedule snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Insert,
    Update { event_id: String },
    Skip(SkipReason),
}

/// Decides the write for `block` against `schedule`.
///
/// An event already tagged with `order_id` is updated in place without
/// capacity or overlap checks; it is this booking's own earlier write.
pub fn plan_reconciliation(
    order_id: Option<&str>,
    block: &TimeWindow,
    schedule: &DaySchedule,
    rules: &SchedulingConfig,
) -> Plan {
    if let Some(existing) = order_id.and_then(|id| schedule.find_order(id)) {
        return Plan::Update {
            event_id: existing.id.clone(),
        };
    }
    if schedule.is_full(rules.day_cap, None) {
        return Plan::Skip(SkipReason::Capacity);
    }
    if schedule.first_conflict(block, None).is_some() {
        return Plan::Skip(SkipReason::Overlap);
    }
    Plan::Insert
}

/// Schedule of the booking's local day, fetched over the day and `block`.
pub async fn load_schedule<C>(
    calendar: &C,
    settings: &BookingSettings,
    start: DateTime<Utc>,
    block: &TimeWindow,
) -> Result<DaySchedule, FulfillmentError>
where
    C: CalendarService + ?Sized,
{
    let local_date = start.with_timezone(&settings.time_zone).date_naive();
    let day = local_day(local_date, settings.time_zone)?;
    Ok(fetch_day_schedule(calendar, &settings.calendar_id, day, day.union(block)).await?)
}

async fn apply_plan<C>(
    calendar: &C,
    settings: &BookingSettings,
    plan: Plan,
    body: EventBody,
) -> Result<ReconcileOutcome, FulfillmentError>
where
    C: CalendarService + ?Sized,
{
    let calendar_error = |e: C::Error| FulfillmentError::Calendar(e.to_string());
    match plan {
        Plan::Skip(reason) => Ok(ReconcileOutcome::Skipped(reason)),
        Plan::Update { event_id } => {
            calendar
                .update_event(&settings.calendar_id, &event_id, body)
                .await
                .map_err(calendar_error)?;
            Ok(ReconcileOutcome::Updated { event_id })
        }
        Plan::Insert => {
            let created = calendar
                .insert_event(&settings.calendar_id, body)
                .await
                .map_err(calendar_error)?;
            let event_id = created.event_id.ok_or_else(|| {
                FulfillmentError::Calendar("insert returned no event id".to_string())
            })?;
            Ok(ReconcileOutcome::Created { event_id })
        }
    }
}

/// Idempotent upsert of the booking paid by `session_id`.
///
/// Missing start or hours is a skip, not an error: the notifier must still
/// get an acknowledgement. Calendar failures are errors so it retries.
pub async fn reconcile<C>(
    calendar: &C,
    settings: &BookingSettings,
    session_id: &str,
    fields: &BookingFields,
) -> Result<ReconcileOutcome, FulfillmentError>
where
    C: CalendarService + ?Sized,
{
    let Some((start, live_hours)) = fields.schedule() else {
        warn!(
            "Session {} is missing startISO/hours; skipping calendar write",
            session_id
        );
        return Ok(ReconcileOutcome::Skipped(SkipReason::MissingFields));
    };
    let block = match block_window(start, live_hours, &settings.rules) {
        Ok(block) => block,
        Err(e) => {
            warn!("Session {} has no usable block window: {}", session_id, e);
            return Ok(ReconcileOutcome::Skipped(SkipReason::MissingFields));
        }
    };

    let schedule = load_schedule(calendar, settings, start, &block).await?;
    let source = BookingSource::Checkout { session_id };
    let plan = plan_reconciliation(source.order_id(), &block, &schedule, &settings.rules);
    if let Plan::Skip(reason) = &plan {
        warn!("Session {} not booked: {}", session_id, reason.as_str());
    }

    let body = build_event_body(fields, block, live_hours, source, settings);
    let outcome = apply_plan(calendar, settings, plan, body).await?;
    info!("Reconciled session {}: {:?}", session_id, outcome);
    Ok(outcome)
}

// --- Manual Manager Booking ---

const MANUAL_REQUIRED: [&str; 5] = ["fullName", "dateISO", "startISO", "pkg", "mainBar"];

/// Required-field check for manager bookings; lists every required field
/// when any is missing.
pub fn validate_manual(metadata: &BookingMetadata) -> Result<(), FulfillmentError> {
    let missing = MANUAL_REQUIRED
        .iter()
        .any(|key| !metadata.get(*key).is_some_and(|v| !v.trim().is_empty()));
    if missing {
        return Err(FulfillmentError::MissingFields(MANUAL_REQUIRED.join(", ")));
    }
    Ok(())
}

/// Books directly from the manager UI, subject to the same capacity and
/// overlap rules as a paid checkout. Manual bookings carry no order id, so a
/// repeated request books twice if the slot is still free.
pub async fn create_manual_booking<C>(
    calendar: &C,
    settings: &BookingSettings,
    metadata: &BookingMetadata,
) -> Result<ReconcileOutcome, FulfillmentError>
where
    C: CalendarService + ?Sized,
{
    validate_manual(metadata)?;
    let fields = BookingFields::from_metadata(metadata, &settings.rules);
    let start = fields.start.ok_or_else(|| {
        FulfillmentError::InvalidBooking(format!("Invalid startISO '{}'", fields.start_iso))
    })?;
    let live_hours = fields.live_hours.ok_or_else(|| {
        FulfillmentError::InvalidBooking(format!(
            "Invalid hours: expected more than 0 and at most {}",
            settings.rules.max_live_hours
        ))
    })?;

    let block = block_window(start, live_hours, &settings.rules)?;
    let schedule = load_schedule(calendar, settings, start, &block).await?;
    let plan = plan_reconciliation(None, &block, &schedule, &settings.rules);
    let body = build_event_body(&fields, block, live_hours, BookingSource::Manual, settings);
    let outcome = apply_plan(calendar, settings, plan, body).await?;
    info!("Manual booking for {} on {}: {:?}", fields.full_name, fields.date_iso, outcome);
    Ok(outcome)
}

// --- Response Structures ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ManualBookingResponse {
    pub ok: bool,
    /// `created`, `capacity` or `overlap`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub message: String,
}

impl From<ReconcileOutcome> for ManualBookingResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Created { event_id } | ReconcileOutcome::Updated { event_id } => Self {
                ok: true,
                status: "created".to_string(),
                event_id: Some(event_id),
                message: "Booking added to Google Calendar".to_string(),
            },
            ReconcileOutcome::Skipped(reason) => Self {
                ok: false,
                status: reason.as_str().to_string(),
                event_id: None,
                message: match reason {
                    SkipReason::Capacity => "Day is fully booked".to_string(),
                    SkipReason::Overlap => "Time slot overlaps another booking".to_string(),
                    SkipReason::MissingFields => "Missing booking fields".to_string(),
                },
            },
        }
    }
}
