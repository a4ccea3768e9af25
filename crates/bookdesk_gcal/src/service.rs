// --- File: crates/bookdesk_gcal/src/service.rs ---
//! Google Calendar implementation of `CalendarService`.

use bookdesk_common::{
    CalendarEvent, CalendarEventResult, CalendarService, BoxFuture, EventBody, EventStatus,
    TimeWindow,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use google_calendar3::api::{Event, EventDateTime, EventExtendedProperties};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::HubType;
use crate::logic::local_instant;

const PAGE_SIZE: i32 = 250;

/// Errors that can occur when interacting with Google Calendar.
#[derive(Error, Debug)]
pub enum GcalServiceError {
    #[error("Google API Error: {0}")]
    ApiError(#[from] google_calendar3::Error),
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
}

pub struct GoogleCalendarService {
    calendar_hub: Arc<HubType>,
    time_zone: Tz,
}

impl GoogleCalendarService {
    /// `time_zone` anchors all-day events, which Google reports as bare dates.
    pub fn new(calendar_hub: Arc<HubType>, time_zone: Tz) -> Self {
        Self {
            calendar_hub,
            time_zone,
        }
    }
}

fn instant(value: Option<&EventDateTime>, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value?;
    if let Some(dt) = value.date_time {
        return Some(dt);
    }
    value.date.and_then(|d| local_instant(d, 0, tz).ok())
}

/// Converts a Google event, returning `None` when it lacks an id or a
/// usable time range.
pub fn from_google_event(event: Event, tz: Tz) -> Option<CalendarEvent> {
    let id = event.id?;
    let start = instant(event.start.as_ref(), tz)?;
    let end = instant(event.end.as_ref(), tz)?;
    let window = TimeWindow::new(start, end).ok()?;
    let private_properties = event
        .extended_properties
        .and_then(|p| p.private)
        .map(|p| p.into_iter().collect())
        .unwrap_or_default();
    Some(CalendarEvent {
        id,
        summary: event.summary,
        window,
        status: EventStatus::parse(event.status.as_deref()),
        private_properties,
    })
}

pub fn to_google_event(body: EventBody) -> Event {
    let when = |dt: DateTime<Utc>| EventDateTime {
        date_time: Some(dt),
        time_zone: Some(body.time_zone.clone()),
        ..Default::default()
    };
    let locked = body.lock_guests.then_some(false);
    let private: HashMap<String, String> = body.private_properties.into_iter().collect();

    Event {
        summary: Some(body.summary),
        description: body.description,
        location: body.location,
        start: Some(when(body.window.start)),
        end: Some(when(body.window.end)),
        color_id: body.color_id,
        extended_properties: Some(EventExtendedProperties {
            private: Some(private),
            shared: None,
        }),
        guests_can_invite_others: locked,
        guests_can_modify: locked,
        guests_can_see_other_guests: locked,
        ..Default::default()
    }
}

fn to_result(event: Event) -> CalendarEventResult {
    CalendarEventResult {
        event_id: event.id,
        status: event.status.unwrap_or_else(|| "confirmed".to_string()),
    }
}

impl CalendarService for GoogleCalendarService {
    type Error = GcalServiceError;

    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarEvent>, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let calendar_hub = self.calendar_hub.clone();
        let tz = self.time_zone;

        Box::pin(async move {
            let mut events = Vec::new();
            let mut page_token: Option<String> = None;
            loop {
                let mut request = calendar_hub
                    .events()
                    .list(&calendar_id)
                    .time_min(time_min)
                    .time_max(time_max)
                    .single_events(true)
                    .order_by("startTime")
                    .max_results(PAGE_SIZE);
                if let Some(token) = page_token.as_deref() {
                    request = request.page_token(token);
                }

                let (_, page) = request.doit().await?;
                for item in page.items.unwrap_or_default() {
                    let item_id = item.id.clone();
                    match from_google_event(item, tz) {
                        Some(event) => events.push(event),
                        None => warn!("Skipping calendar event without usable times: {:?}", item_id),
                    }
                }

                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
            debug!("Listed {} events from {}", events.len(), calendar_id);
            Ok(events)
        })
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let (_response, created) = calendar_hub
                .events()
                .insert(to_google_event(body), &calendar_id)
                .send_updates("none")
                .doit()
                .await?;
            if created.id.is_none() {
                return Err(GcalServiceError::MalformedEvent(
                    "insert returned no event id".to_string(),
                ));
            }
            Ok(to_result(created))
        })
    }

    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let (_response, updated) = calendar_hub
                .events()
                .patch(to_google_event(body), &calendar_id, &event_id)
                .send_updates("none")
                .doit()
                .await?;
            Ok(CalendarEventResult {
                event_id: updated.id.or(Some(event_id)),
                status: updated.status.unwrap_or_else(|| "confirmed".to_string()),
            })
        })
    }
}
