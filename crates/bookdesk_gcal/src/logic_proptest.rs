#[cfg(test)]
mod tests {
    use crate::logic::{block_window, compute_slots, local_day, DaySchedule};
    use bookdesk_common::{CalendarEvent, EventStatus, TimeWindow};
    use bookdesk_config::SchedulingConfig;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    const ZONES: [Tz; 4] = [
        Tz::UTC,
        chrono_tz::America::Los_Angeles,
        chrono_tz::Europe::Zurich,
        chrono_tz::Australia::Sydney,
    ];

    fn event(i: usize, start_min: i64, len_min: i64) -> CalendarEvent {
        let base = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap();
        let start = base + Duration::minutes(start_min);
        CalendarEvent {
            id: format!("e{i}"),
            summary: None,
            window: TimeWindow::new(start, start + Duration::minutes(len_min)).unwrap(),
            status: EventStatus::Confirmed,
            private_properties: BTreeMap::new(),
        }
    }

    fn events_strategy() -> impl Strategy<Value = Vec<CalendarEvent>> {
        prop::collection::vec((-600i64..2_400, 15i64..480), 0..4).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (start, len))| event(i, start, len))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn slots_never_overlap_existing_events(
            events in events_strategy(),
            live_tenths in 10u32..80,
            zone in 0usize..ZONES.len(),
            now_offset in -2_000i64..2_000,
        ) {
            let rules = SchedulingConfig { day_cap: 0, ..SchedulingConfig::default() };
            let tz = ZONES[zone];
            let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
            let live = f64::from(live_tenths) / 10.0;
            let now = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap() + Duration::minutes(now_offset);
            let schedule = DaySchedule::new(local_day(date, tz).unwrap(), events.clone());

            let slots = compute_slots(date, live, &schedule, tz, &rules, now).unwrap();

            prop_assert!(slots.windows(2).all(|w| w[0] < w[1]));
            for slot in &slots {
                prop_assert!(*slot >= now);
                let block = block_window(*slot, live, &rules).unwrap();
                for e in &events {
                    prop_assert!(!block.overlaps(&e.window));
                }
            }
        }

        #[test]
        fn full_days_have_no_slots(
            events in events_strategy(),
            zone in 0usize..ZONES.len(),
        ) {
            let rules = SchedulingConfig::default();
            let tz = ZONES[zone];
            let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
            let schedule = DaySchedule::new(local_day(date, tz).unwrap(), events);
            let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

            let slots = compute_slots(date, 2.0, &schedule, tz, &rules, past).unwrap();
            if schedule.booked_count(None) >= rules.day_cap as usize {
                prop_assert!(slots.is_empty());
            }
        }

        #[test]
        fn overlap_is_symmetric(a in 0i64..1_000, la in 1i64..300, b in 0i64..1_000, lb in 1i64..300) {
            let x = event(0, a, la).window;
            let y = event(1, b, lb).window;
            prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
            prop_assert_eq!(x.overlaps(&y), !(a + la <= b || a >= b + lb));
        }
    }
}
