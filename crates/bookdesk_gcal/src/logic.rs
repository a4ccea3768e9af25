// --- File: crates/bookdesk_gcal/src/logic.rs ---
//! Availability Engine: time-zone aware slot generation, block windows and
//! day schedules shared with booking reconciliation.

use bookdesk_common::{
    invalid_input, upstream_failure, BookdeskError, CalendarEvent, CalendarService, TimeWindow,
};
use bookdesk_config::SchedulingConfig;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- Error Handling ---
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("Missing date (YYYY-MM-DD)")]
    MissingDate,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid timestamp '{0}', expected RFC 3339")]
    InvalidTimestamp(String),
    #[error("Unknown time zone '{0}'")]
    InvalidTimeZone(String),
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),
    #[error("{0}")]
    Calendar(String),
}

impl From<GcalError> for BookdeskError {
    fn from(err: GcalError) -> Self {
        match err {
            GcalError::Calendar(message) => upstream_failure("Google Calendar", message),
            other => invalid_input(other),
        }
    }
}

// --- Data Structures ---
#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AvailabilityQuery {
    /// Calendar date in YYYY-MM-DD format
    #[cfg_attr(feature = "openapi", param(example = "2025-06-14"))]
    pub date: Option<String>,
    /// Requested live-service hours; defaults to 2 and is clamped to the
    /// configured `[min_live_hours, max_live_hours]` (1 to 24 by default).
    /// The clamped value is echoed back as `liveHours`.
    #[cfg_attr(feature = "openapi", param(example = "2.5"))]
    pub hours: Option<String>,
    /// IANA time zone overriding the configured one
    #[cfg_attr(feature = "openapi", param(example = "America/Los_Angeles"))]
    pub tz: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(rename = "startISO")]
    #[cfg_attr(feature = "openapi", schema(example = "2025-06-14T16:00:00.000Z"))]
    pub start_iso: String,
    /// Wall-clock start in the calendar's zone, HH:MM
    #[cfg_attr(feature = "openapi", schema(example = "09:00"))]
    pub local_time: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub ok: bool,
    pub date: String,
    pub live_hours: f64,
    pub time_zone: String,
    pub slots: Vec<Slot>,
}

// --- Parsing ---

pub fn parse_time_zone(name: &str) -> Result<Tz, GcalError> {
    Tz::from_str(name.trim()).map_err(|_| GcalError::InvalidTimeZone(name.to_string()))
}

pub fn parse_date(date: Option<&str>) -> Result<NaiveDate, GcalError> {
    let raw = date.map(str::trim).filter(|d| !d.is_empty()).ok_or(GcalError::MissingDate)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| GcalError::InvalidDate(raw.to_string()))
}

/// Parses an RFC 3339 instant such as `2025-06-14T16:00:00.000Z`.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, GcalError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| GcalError::InvalidTimestamp(value.to_string()))
}

/// Requested live hours, defaulting when absent or unparsable and clamped
/// to `[min_live_hours, max_live_hours]`.
pub fn resolve_live_hours(requested: Option<&str>, rules: &SchedulingConfig) -> f64 {
    let parsed = requested
        .and_then(|h| h.trim().parse::<f64>().ok())
        .filter(|h| h.is_finite());
    parsed
        .unwrap_or(rules.default_live_hours)
        .max(rules.min_live_hours)
        .min(rules.max_live_hours)
}

/// Formats an instant the way clients send it back (`...T16:00:00.000Z`).
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// --- Windows ---

/// `None` for non-finite or unrepresentable durations.
pub fn hours(h: f64) -> Option<Duration> {
    let millis = (h * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// `[start - prep, start + live + clean]`
pub fn block_window(
    start: DateTime<Utc>,
    live_hours: f64,
    rules: &SchedulingConfig,
) -> Result<TimeWindow, GcalError> {
    let out_of_range =
        || GcalError::InvalidWindow(format!("{live_hours} live hours from {start} is out of range"));
    let begin = hours(rules.prep_hours)
        .and_then(|prep| start.checked_sub_signed(prep))
        .ok_or_else(out_of_range)?;
    let end = hours(live_hours + rules.clean_hours)
        .and_then(|rest| start.checked_add_signed(rest))
        .ok_or_else(out_of_range)?;
    TimeWindow::new(begin, end).map_err(|e| GcalError::InvalidWindow(e.to_string()))
}

fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        // Fall-back transition: the first occurrence of the wall-clock time.
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// The instant of `hour:00` local time on `date` in `tz`.
///
/// A wall-clock time skipped by a spring-forward gap resolves to the first
/// valid instant after it (02:00 -> 03:00 on a US transition day).
pub fn local_instant(date: NaiveDate, hour: u32, tz: Tz) -> Result<DateTime<Utc>, GcalError> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| GcalError::InvalidWindow(format!("hour {hour} is out of range")))?;
    resolve_local(naive, tz)
        .or_else(|| resolve_local(naive + Duration::hours(1), tz))
        .ok_or_else(|| GcalError::InvalidWindow(format!("{naive} does not exist in {tz}")))
}

/// Local midnight to the next local midnight.
pub fn local_day(date: NaiveDate, tz: Tz) -> Result<TimeWindow, GcalError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| GcalError::InvalidDate(date.to_string()))?;
    TimeWindow::new(local_instant(date, 0, tz)?, local_instant(next, 0, tz)?)
        .map_err(|e| GcalError::InvalidWindow(e.to_string()))
}

/// Range to fetch for an availability query: the local day plus every block
/// window a candidate could occupy, so events spilling past midnight are seen.
pub fn availability_fetch_window(
    date: NaiveDate,
    live_hours: f64,
    tz: Tz,
    rules: &SchedulingConfig,
) -> Result<TimeWindow, GcalError> {
    let day = local_day(date, tz)?;
    if rules.business_hours_start > rules.business_hours_end {
        return Ok(day);
    }
    let first = block_window(local_instant(date, rules.business_hours_start, tz)?, live_hours, rules)?;
    let last = block_window(local_instant(date, rules.business_hours_end, tz)?, live_hours, rules)?;
    Ok(day.union(&first).union(&last))
}

// --- Day Schedule ---

/// Non-cancelled events around one calendar day.
///
/// `events` may extend beyond `day` (they were fetched over a wider range for
/// the overlap test); capacity only counts events intersecting `day`.
#[derive(Debug, Clone)]
pub struct DaySchedule {
    day: TimeWindow,
    events: Vec<CalendarEvent>,
}

impl DaySchedule {
    pub fn new(day: TimeWindow, events: Vec<CalendarEvent>) -> Self {
        let events = events.into_iter().filter(|e| !e.is_cancelled()).collect();
        Self { day, events }
    }

    pub fn day(&self) -> TimeWindow {
        self.day
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Bookings on the day, ignoring the event with id `excluding`.
    pub fn booked_count(&self, excluding: Option<&str>) -> usize {
        self.events
            .iter()
            .filter(|e| e.window.overlaps(&self.day))
            .filter(|e| Some(e.id.as_str()) != excluding)
            .count()
    }

    pub fn is_full(&self, day_cap: u32, excluding: Option<&str>) -> bool {
        day_cap > 0 && self.booked_count(excluding) >= day_cap as usize
    }

    pub fn first_conflict(&self, window: &TimeWindow, excluding: Option<&str>) -> Option<&CalendarEvent> {
        self.events
            .iter()
            .filter(|e| Some(e.id.as_str()) != excluding)
            .find(|e| e.window.overlaps(window))
    }

    /// The event tagged with the given payment session id.
    pub fn find_order(&self, order_id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.order_id() == Some(order_id))
    }
}

/// Lists events over `fetch` and keeps the non-cancelled ones as the schedule
/// of `day`.
pub async fn fetch_day_schedule<C>(
    calendar: &C,
    calendar_id: &str,
    day: TimeWindow,
    fetch: TimeWindow,
) -> Result<DaySchedule, GcalError>
where
    C: CalendarService + ?Sized,
{
    let events = calendar
        .list_events(calendar_id, fetch.start, fetch.end)
        .await
        .map_err(|e| GcalError::Calendar(e.to_string()))?;
    debug!(
        "Fetched {} events for {} between {} and {}",
        events.len(),
        calendar_id,
        fetch.start,
        fetch.end
    );
    Ok(DaySchedule::new(day, events))
}

// --- Availability Engine ---

/// Bookable start instants for `date`, ascending.
///
/// Returns nothing once the day has reached `day_cap`. Otherwise every whole
/// business hour is converted to an instant in `tz`, dropped if it lies
/// before `now`, and dropped if its block window overlaps any scheduled event.
pub fn compute_slots(
    date: NaiveDate,
    live_hours: f64,
    schedule: &DaySchedule,
    tz: Tz,
    rules: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, GcalError> {
    if schedule.is_full(rules.day_cap, None) {
        debug!("{} is at capacity ({} bookings)", date, schedule.booked_count(None));
        return Ok(Vec::new());
    }

    let mut slots: Vec<DateTime<Utc>> = Vec::new();
    for hour in rules.business_hours_start..=rules.business_hours_end {
        let start = local_instant(date, hour, tz)?;
        if start < now {
            continue;
        }
        // Two hours inside a DST gap resolve to the same instant.
        if slots.last().is_some_and(|last| *last >= start) {
            continue;
        }
        let block = block_window(start, live_hours, rules)?;
        if schedule.first_conflict(&block, None).is_some() {
            continue;
        }
        slots.push(start);
    }
    Ok(slots)
}

pub fn to_slot(start: DateTime<Utc>, tz: Tz) -> Slot {
    Slot {
        start_iso: format_instant(start),
        local_time: start.with_timezone(&tz).format("%H:%M").to_string(),
    }
}
