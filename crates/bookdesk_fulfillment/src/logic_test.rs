#[cfg(test)]
mod tests {
    use crate::logic::{
        build_description, build_event_body, create_manual_booking, flatten_payload,
        flatten_value, load_schedule, plan_reconciliation, reconcile, BookingFields,
        BookingMetadata, BookingSettings, BookingSource, FulfillmentError, Plan,
        ReconcileOutcome, SkipReason,
    };
    use bookdesk_gcal::block_window;
    use bookdesk_common::services::memory::InMemoryCalendar;
    use bookdesk_common::{
        BookdeskError, CalendarEvent, CalendarService, EventStatus, HttpStatusCode, TimeWindow,
    };
    use bookdesk_config::SchedulingConfig;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn settings() -> BookingSettings {
        BookingSettings {
            calendar_id: "primary".to_string(),
            time_zone: chrono_tz::UTC,
            color_id: Some("7".to_string()),
            rules: SchedulingConfig::default(),
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, h, m, 0).unwrap()
    }

    fn metadata(pairs: &[(&str, &str)]) -> BookingMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn paid_fields(start_iso: &str) -> BookingFields {
        BookingFields::from_metadata(
            &metadata(&[
                ("startISO", start_iso),
                ("dateISO", "2025-06-14"),
                ("pkg", "150-250-5h"),
                ("mainBar", "Mimosa Bar"),
                ("fullName", "Ana Ruiz"),
                ("email", "ana@example.com"),
                ("venue", "Rose Garden"),
                ("total", "650"),
                ("dueNow", "200"),
                ("payMode", "deposit"),
            ]),
            &SchedulingConfig::default(),
        )
    }

    fn existing(calendar: &InMemoryCalendar, id: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
        calendar.seed(
            "primary",
            CalendarEvent {
                id: id.to_string(),
                summary: Some("existing".to_string()),
                window: TimeWindow::new(start, end).unwrap(),
                status: EventStatus::Confirmed,
                private_properties: BTreeMap::new(),
            },
        );
    }

    #[tokio::test]
    async fn redelivery_updates_instead_of_creating() {
        let calendar = InMemoryCalendar::new();
        let fields = paid_fields("2025-06-14T16:00:00.000Z");

        let first = reconcile(&calendar, &settings(), "sess_1", &fields).await.unwrap();
        let ReconcileOutcome::Created { event_id } = first else {
            panic!("expected created, got {first:?}");
        };
        let second = reconcile(&calendar, &settings(), "sess_1", &fields).await.unwrap();
        assert_eq!(second, ReconcileOutcome::Updated { event_id: event_id.clone() });

        let events = calendar.events("primary");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event_id);
        assert_eq!(events[0].order_id(), Some("sess_1"));
        assert_eq!(calendar.write_count(), 2);
    }

    #[tokio::test]
    async fn redelivery_is_updated_even_when_day_is_full() {
        let calendar = InMemoryCalendar::new();
        let fields = paid_fields("2025-06-14T16:00:00.000Z");
        reconcile(&calendar, &settings(), "sess_1", &fields).await.unwrap();
        existing(&calendar, "other", at(2, 0), at(3, 0));

        let outcome = reconcile(&calendar, &settings(), "sess_1", &fields).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Updated { .. }));
    }

    #[tokio::test]
    async fn full_day_skips_with_capacity() {
        let calendar = InMemoryCalendar::new();
        existing(&calendar, "a", at(1, 0), at(2, 0));
        existing(&calendar, "b", at(3, 0), at(4, 0));

        let outcome = reconcile(&calendar, &settings(), "sess_2", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::Capacity));
        assert_eq!(calendar.write_count(), 0);
    }

    #[tokio::test]
    async fn overlapping_block_skips_with_overlap() {
        let calendar = InMemoryCalendar::new();
        // 150-250-5h runs 2.5h: block is [15:00, 19:30).
        existing(&calendar, "late", at(19, 0), at(20, 0));

        let outcome = reconcile(&calendar, &settings(), "sess_3", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::Overlap));
        assert_eq!(calendar.events("primary").len(), 1);
    }

    #[tokio::test]
    async fn touching_block_is_booked() {
        let calendar = InMemoryCalendar::new();
        existing(&calendar, "late", at(19, 30), at(20, 0));

        let outcome = reconcile(&calendar, &settings(), "sess_4", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn cancelled_events_do_not_block() {
        let calendar = InMemoryCalendar::new();
        calendar.seed(
            "primary",
            CalendarEvent {
                id: "gone".to_string(),
                summary: None,
                window: TimeWindow::new(at(16, 0), at(17, 0)).unwrap(),
                status: EventStatus::Cancelled,
                private_properties: BTreeMap::new(),
            },
        );
        let outcome = reconcile(&calendar, &settings(), "sess_5", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn missing_start_skips_without_calling_the_calendar() {
        let calendar = InMemoryCalendar::new();
        // Any call would fail, so an Ok result proves none was made.
        calendar.fail_all();
        let fields = BookingFields::from_metadata(
            &metadata(&[("pkg", "50-150-5h"), ("mainBar", "Mimosa Bar")]),
            &SchedulingConfig::default(),
        );

        let outcome = reconcile(&calendar, &settings(), "sess_6", &fields).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::MissingFields));
    }

    #[tokio::test]
    async fn unparsable_start_counts_as_missing() {
        let calendar = InMemoryCalendar::new();
        let fields = paid_fields("next tuesday");
        let outcome = reconcile(&calendar, &settings(), "sess_7", &fields).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::MissingFields));
    }

    #[tokio::test]
    async fn oversized_hours_skip_without_calling_the_calendar() {
        let calendar = InMemoryCalendar::new();
        calendar.fail_all();
        let mut md = metadata(&[
            ("startISO", "2025-06-14T16:00:00Z"),
            ("pkg", "50-150-5h"),
            ("mainBar", "Mimosa Bar"),
        ]);
        md.insert("hours".to_string(), "1e10".to_string());
        let fields = BookingFields::from_metadata(&md, &SchedulingConfig::default());
        assert_eq!(fields.live_hours, None);

        let outcome = reconcile(&calendar, &settings(), "sess_9", &fields).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::MissingFields));
    }

    #[tokio::test]
    async fn unrepresentable_block_window_skips() {
        let calendar = InMemoryCalendar::new();
        calendar.fail_all();
        let mut s = settings();
        s.rules.max_live_hours = f64::MAX;
        let mut md = metadata(&[("startISO", "2025-06-14T16:00:00Z"), ("pkg", "50-150-5h")]);
        md.insert("hours".to_string(), "1e300".to_string());
        let fields = BookingFields::from_metadata(&md, &s.rules);
        assert_eq!(fields.live_hours, Some(1e300));

        let outcome = reconcile(&calendar, &s, "sess_10", &fields).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::MissingFields));
    }

    #[tokio::test]
    async fn calendar_failure_is_an_upstream_error() {
        let calendar = InMemoryCalendar::new();
        calendar.fail_all();
        let err = reconcile(&calendar, &settings(), "sess_8", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Calendar(_)));
        assert_eq!(BookdeskError::from(err).status_code(), 500);
    }

    #[tokio::test]
    async fn concurrent_deliveries_from_one_snapshot_both_insert() {
        // Two sessions for the same slot read the day before either writes.
        let calendar = InMemoryCalendar::new();
        let s = settings();
        let block = block_window(at(16, 0), 2.5, &s.rules).unwrap();
        let snapshot = load_schedule(&calendar, &s, at(16, 0), &block).await.unwrap();

        let first = plan_reconciliation(Some("sess_a"), &block, &snapshot, &s.rules);
        let second = plan_reconciliation(Some("sess_b"), &block, &snapshot, &s.rules);
        assert_eq!(first, Plan::Insert);
        assert_eq!(second, Plan::Insert);

        // Sequential delivery sees the first write and refuses the second.
        reconcile(&calendar, &s, "sess_a", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap();
        let outcome = reconcile(&calendar, &s, "sess_b", &paid_fields("2025-06-14T16:00:00Z"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::Overlap));
    }

    #[test]
    fn hours_resolve_from_explicit_value_then_package() {
        let rules = SchedulingConfig::default();
        let explicit = BookingFields::from_metadata(
            &metadata(&[("hours", "4"), ("pkg", "50-150-5h")]),
            &rules,
        );
        assert_eq!(explicit.live_hours, Some(4.0));

        let packaged = BookingFields::from_metadata(&metadata(&[("hours", "0"), ("pkg", "250-350-6h")]), &rules);
        assert_eq!(packaged.live_hours, Some(3.0));

        let unknown = BookingFields::from_metadata(&metadata(&[("pkg", "custom")]), &rules);
        assert_eq!(unknown.live_hours, Some(2.0));
        assert_eq!(unknown.main_bar, "Booking");
    }

    #[test]
    fn event_body_is_canonical() {
        let fields = BookingFields {
            second_enabled: true,
            second_bar: "Espresso".to_string(),
            second_size: "S".to_string(),
            discount: "20".to_string(),
            ..paid_fields("2025-06-14T16:00:00.000Z")
        };
        let window = TimeWindow::new(at(15, 0), at(19, 30)).unwrap();
        let body = build_event_body(
            &fields,
            window,
            2.5,
            BookingSource::Checkout { session_id: "cs_test_9" },
            &settings(),
        );

        assert_eq!(body.summary, "MANAGER - Mimosa Bar (150-250-5h) - $650.00");
        assert_eq!(body.location.as_deref(), Some("Rose Garden"));
        assert_eq!(body.color_id.as_deref(), Some("7"));
        assert_eq!(body.time_zone, "UTC");
        assert!(body.lock_guests);
        assert_eq!(body.window, window);
        assert_eq!(body.order_id(), Some("cs_test_9"));
        assert_eq!(body.private_properties["source"], "manager");
        assert_eq!(body.private_properties["secondEnabled"], "true");
        assert_eq!(body.private_properties["fountainEnabled"], "false");
        assert_eq!(body.private_properties["discount"], "20");

        let description = body.description.unwrap();
        let lines: Vec<&str> = description.lines().collect();
        assert_eq!(lines[0], "Manager Booking (Stripe)");
        assert!(lines.contains(&"Second Bar: Espresso (S)"));
        assert!(lines.contains(&"Service hours: 2.5"));
        assert!(lines.contains(&"Discount: -$20"));
        assert!(lines.contains(&"Paid now: $200"));
        assert_eq!(lines.last(), Some(&"Stripe session: cs_test_9"));
        assert!(!lines.iter().any(|l| l.starts_with("Phone")));
        assert!(!lines.iter().any(|l| l.starts_with("Fountain")));
    }

    #[test]
    fn manual_description_has_no_session_line() {
        let description = build_description(&paid_fields("2025-06-14T16:00:00Z"), 2.0, BookingSource::Manual);
        assert!(description.starts_with("Manager Booking (Manual)"));
        assert!(description.contains("Service hours: 2\n"));
        assert!(!description.contains("Stripe session"));
    }

    #[test]
    fn summary_defaults_total_to_zero() {
        let fields = BookingFields {
            total: String::new(),
            ..paid_fields("2025-06-14T16:00:00Z")
        };
        let window = TimeWindow::new(at(15, 0), at(19, 0)).unwrap();
        let body = build_event_body(&fields, window, 2.0, BookingSource::Manual, &settings());
        assert_eq!(body.summary, "MANAGER - Mimosa Bar (150-250-5h) - $0.00");
        assert_eq!(body.order_id(), None);
    }

    #[test]
    fn payload_flattens_to_strings() {
        let payload = json!({
            "pkg": "50-150-5h",
            "total": 450.5,
            "secondEnabled": true,
            "addons": ["Churros", "Lights"],
            "extras": {"tip": 10},
            "notes": null
        });
        let flat = flatten_payload(payload.as_object().unwrap());
        assert_eq!(flat["total"], "450.5");
        assert_eq!(flat["secondEnabled"], "true");
        assert_eq!(flat["addons"], "Churros,Lights");
        assert_eq!(flat["extras"], r#"{"tip":10}"#);
        assert_eq!(flat["notes"], "");
        assert_eq!(flatten_value(&json!([{"name": "Lights"}])), r#"{"name":"Lights"}"#);
    }

    fn manual(pairs: &[(&str, &str)]) -> BookingMetadata {
        let mut md = metadata(&[
            ("fullName", "Ana Ruiz"),
            ("dateISO", "2025-06-14"),
            ("startISO", "2025-06-14T16:00:00.000Z"),
            ("pkg", "50-150-5h"),
            ("mainBar", "Mimosa Bar"),
        ]);
        md.extend(metadata(pairs));
        md
    }

    #[tokio::test]
    async fn manual_booking_requires_all_fields() {
        let calendar = InMemoryCalendar::new();
        let err = create_manual_booking(&calendar, &settings(), &manual(&[("fullName", " ")]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing fields (fullName, dateISO, startISO, pkg, mainBar)"
        );
        assert_eq!(BookdeskError::from(err).status_code(), 400);
    }

    #[tokio::test]
    async fn manual_booking_rejects_bad_start() {
        let calendar = InMemoryCalendar::new();
        let err = create_manual_booking(&calendar, &settings(), &manual(&[("startISO", "soon")]))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidBooking(_)));
    }

    #[tokio::test]
    async fn manual_booking_rejects_oversized_hours() {
        let calendar = InMemoryCalendar::new();
        let err = create_manual_booking(&calendar, &settings(), &manual(&[("hours", "1e10")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid hours: expected more than 0 and at most 24");
        assert_eq!(BookdeskError::from(err).status_code(), 400);
        assert_eq!(calendar.write_count(), 0);
    }

    #[tokio::test]
    async fn manual_booking_is_checked_and_not_idempotent() {
        let calendar = InMemoryCalendar::new();
        let first = create_manual_booking(&calendar, &settings(), &manual(&[])).await.unwrap();
        assert!(matches!(first, ReconcileOutcome::Created { .. }));
        let events = calendar.events("primary");
        assert_eq!(events[0].order_id(), None);
        assert_eq!(events[0].private_properties["source"], "manager");

        let second = create_manual_booking(&calendar, &settings(), &manual(&[])).await.unwrap();
        assert_eq!(second, ReconcileOutcome::Skipped(SkipReason::Overlap));

        let list = calendar.list_events("primary", at(0, 0), at(23, 0)).await.unwrap();
        assert_eq!(list.len(), 1);
    }
}
