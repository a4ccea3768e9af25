use bookdesk_common::{CalendarEvent, EventStatus, TimeWindow};
use bookdesk_config::SchedulingConfig;
use bookdesk_gcal::logic::{compute_slots, local_day, DaySchedule};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;

fn create_events(base: DateTime<Utc>, count: usize, length_minutes: i64) -> Vec<CalendarEvent> {
    (0..count)
        .map(|i| {
            let start = base + Duration::minutes(90 * i as i64);
            CalendarEvent {
                id: format!("evt-{i}"),
                summary: None,
                window: TimeWindow::new(start, start + Duration::minutes(length_minutes)).unwrap(),
                status: EventStatus::Confirmed,
                private_properties: BTreeMap::new(),
            }
        })
        .collect()
}

fn benchmark_compute_slots(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_slots");
    let tz: Tz = chrono_tz::America::Los_Angeles;
    let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
    let day = local_day(date, tz).unwrap();
    let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let rules = SchedulingConfig {
        day_cap: 0,
        ..SchedulingConfig::default()
    };

    group.bench_function("empty_day", |b| {
        let schedule = DaySchedule::new(day, Vec::new());
        b.iter(|| compute_slots(black_box(date), 2.0, &schedule, tz, &rules, past))
    });

    group.bench_function("busy_day", |b| {
        let schedule = DaySchedule::new(day, create_events(day.start, 12, 45));
        b.iter(|| compute_slots(black_box(date), 2.0, &schedule, tz, &rules, past))
    });

    group.bench_function("dst_transition_day", |b| {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let day = local_day(date, tz).unwrap();
        let schedule = DaySchedule::new(day, create_events(day.start, 4, 60));
        b.iter(|| compute_slots(black_box(date), 3.0, &schedule, tz, &rules, past))
    });

    group.finish();
}

criterion_group!(benches, benchmark_compute_slots);
criterion_main!(benches);
