//! Calendar domain types shared by the availability, booking and
//! reconciliation code paths.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Private extended property carrying the payment session id.
pub const ORDER_ID_KEY: &str = "orderId";

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for InvalidWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window end {} is not after start {}",
            self.end.to_rfc3339(),
            self.start.to_rfc3339()
        )
    }
}

impl std::error::Error for InvalidWindow {}

impl TimeWindow {
    /// Builds a window, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidWindow> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidWindow { start, end })
        }
    }

    /// Two windows do not overlap iff one ends at or before the other starts.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }

    /// The window covering both `self` and `other`.
    pub fn union(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Unknown statuses are treated as active.
    pub fn parse(status: Option<&str>) -> Self {
        match status {
            Some("cancelled") => EventStatus::Cancelled,
            Some("tentative") => EventStatus::Tentative,
            _ => EventStatus::Confirmed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Tentative => "tentative",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

/// An event as read back from the calendar service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub window: TimeWindow,
    pub status: EventStatus,
    /// Caller-defined private metadata bag.
    #[serde(default)]
    pub private_properties: BTreeMap<String, String>,
}

impl CalendarEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    pub fn order_id(&self) -> Option<&str> {
        self.private_properties
            .get(ORDER_ID_KEY)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// The payload written on insert or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub window: TimeWindow,
    /// IANA zone the calendar should display the event in.
    pub time_zone: String,
    pub color_id: Option<String>,
    #[serde(default)]
    pub private_properties: BTreeMap<String, String>,
    /// Prevents guests from inviting, modifying or seeing other guests.
    #[serde(default)]
    pub lock_guests: bool,
}

impl EventBody {
    pub fn order_id(&self) -> Option<&str> {
        self.private_properties.get(ORDER_ID_KEY).map(String::as_str)
    }
}

/// Represents the result of a calendar write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventResult {
    pub event_id: Option<String>,
    pub status: String,
}
