use bookdesk_common::services::memory::InMemoryCalendar;
use bookdesk_common::{CalendarEvent, EventStatus, TimeWindow};
use bookdesk_config::SchedulingConfig;
use bookdesk_gcal::logic::{availability_fetch_window, compute_slots, fetch_day_schedule, local_day};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

fn seeded(calendar: &InMemoryCalendar, id: &str, start_h: u32, end_h: u32, status: EventStatus) {
    calendar.seed(
        "primary",
        CalendarEvent {
            id: id.to_string(),
            summary: None,
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2025, 6, 14, start_h, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 6, 14, end_h, 0, 0).unwrap(),
            )
            .unwrap(),
            status,
            private_properties: BTreeMap::new(),
        },
    );
}

#[tokio::test]
async fn fetched_schedule_drives_slot_generation() {
    let tz = chrono_tz::America::Los_Angeles;
    let rules = SchedulingConfig::default();
    let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
    let calendar = InMemoryCalendar::new();
    // 10:00-12:00 PDT
    seeded(&calendar, "a", 17, 19, EventStatus::Confirmed);
    seeded(&calendar, "b", 20, 21, EventStatus::Cancelled);

    let day = local_day(date, tz).unwrap();
    let fetch = availability_fetch_window(date, 2.0, tz, &rules).unwrap();
    let schedule = fetch_day_schedule(&calendar, "primary", day, fetch).await.unwrap();
    assert_eq!(schedule.events().len(), 1);

    let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let slots = compute_slots(date, 2.0, &schedule, tz, &rules, past).unwrap();
    let local: Vec<String> = slots
        .iter()
        .map(|s| s.with_timezone(&tz).format("%H").to_string())
        .collect();
    // 13:00 local needs [12:00, 16:00) and only touches the event.
    assert_eq!(local.first().map(String::as_str), Some("13"));
    assert_eq!(local.last().map(String::as_str), Some("22"));
}

#[tokio::test]
async fn unavailable_calendar_surfaces_an_error() {
    let calendar = InMemoryCalendar::new();
    calendar.fail_all();
    let tz = chrono_tz::UTC;
    let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
    let day = local_day(date, tz).unwrap();
    assert!(fetch_day_schedule(&calendar, "primary", day, day).await.is_err());
}
