use crate::service::{from_google_event, to_google_event};
use bookdesk_common::{EventBody, EventStatus, TimeWindow, ORDER_ID_KEY};
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use google_calendar3::api::{Event, EventDateTime, EventExtendedProperties};
use std::collections::{BTreeMap, HashMap};

const LA: Tz = chrono_tz::America::Los_Angeles;

fn timed(h_start: u32, h_end: u32) -> (EventDateTime, EventDateTime) {
    let at = |h| EventDateTime {
        date_time: Some(Utc.with_ymd_and_hms(2025, 6, 14, h, 0, 0).unwrap()),
        ..Default::default()
    };
    (at(h_start), at(h_end))
}

#[test]
fn timed_event_keeps_private_order_id() {
    let (start, end) = timed(17, 20);
    let mut private = HashMap::new();
    private.insert(ORDER_ID_KEY.to_string(), "cs_test_1".to_string());
    let event = Event {
        id: Some("evt1".to_string()),
        start: Some(start),
        end: Some(end),
        status: Some("confirmed".to_string()),
        extended_properties: Some(EventExtendedProperties {
            private: Some(private),
            shared: None,
        }),
        ..Default::default()
    };

    let converted = from_google_event(event, LA).unwrap();
    assert_eq!(converted.id, "evt1");
    assert_eq!(converted.order_id(), Some("cs_test_1"));
    assert_eq!(converted.status, EventStatus::Confirmed);
}

#[test]
fn all_day_event_starts_at_local_midnight() {
    let day = |d| EventDateTime {
        date: Some(NaiveDate::from_ymd_opt(2025, 6, d).unwrap()),
        ..Default::default()
    };
    let event = Event {
        id: Some("allday".to_string()),
        start: Some(day(14)),
        end: Some(day(15)),
        ..Default::default()
    };

    let converted = from_google_event(event, LA).unwrap();
    // PDT is UTC-7 in June.
    assert_eq!(converted.window.start, Utc.with_ymd_and_hms(2025, 6, 14, 7, 0, 0).unwrap());
    assert_eq!(converted.window.end, Utc.with_ymd_and_hms(2025, 6, 15, 7, 0, 0).unwrap());
}

#[test]
fn event_without_times_is_skipped() {
    let event = Event {
        id: Some("broken".to_string()),
        ..Default::default()
    };
    assert!(from_google_event(event, LA).is_none());
}

#[test]
fn cancelled_status_is_preserved() {
    let (start, end) = timed(17, 18);
    let event = Event {
        id: Some("gone".to_string()),
        start: Some(start),
        end: Some(end),
        status: Some("cancelled".to_string()),
        ..Default::default()
    };
    assert!(from_google_event(event, LA).unwrap().is_cancelled());
}

#[test]
fn body_locks_guests_and_carries_metadata() {
    let mut private_properties = BTreeMap::new();
    private_properties.insert(ORDER_ID_KEY.to_string(), "cs_test_2".to_string());
    let body = EventBody {
        summary: "MANAGER - Classic (gold) - $450.00".to_string(),
        description: Some("details".to_string()),
        location: Some("Hall".to_string()),
        window: TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 14, 16, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 14, 20, 0, 0).unwrap(),
        )
        .unwrap(),
        time_zone: "America/Los_Angeles".to_string(),
        color_id: Some("7".to_string()),
        private_properties,
        lock_guests: true,
    };

    let event = to_google_event(body);
    assert_eq!(event.guests_can_modify, Some(false));
    assert_eq!(event.guests_can_invite_others, Some(false));
    assert_eq!(event.guests_can_see_other_guests, Some(false));
    assert_eq!(event.color_id.as_deref(), Some("7"));
    assert_eq!(
        event.start.unwrap().time_zone.as_deref(),
        Some("America/Los_Angeles")
    );
    let private = event.extended_properties.unwrap().private.unwrap();
    assert_eq!(private.get(ORDER_ID_KEY).map(String::as_str), Some("cs_test_2"));
}
