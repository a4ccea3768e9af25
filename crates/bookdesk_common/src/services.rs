//! Service abstractions for external services.
//!
//! Handlers and the reconciliation logic depend on these traits rather than
//! on a concrete client, so tests can swap in the in-memory calendar.

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::models::{CalendarEvent, CalendarEventResult, EventBody};

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// The calendar operations the booking core needs.
///
/// Implementations must support a private metadata bag per event and report
/// cancelled events with `EventStatus::Cancelled`.
pub trait CalendarService: Send + Sync {
    /// Error type returned by calendar service operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Events intersecting `[time_min, time_max)`, cancelled ones included.
    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarEvent>, Self::Error>;

    fn insert_event(
        &self,
        calendar_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error>;

    /// Overwrites the fields of an existing event with `body`.
    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error>;
}

/// Calendar service with its error erased, as held in handler state.
pub type DynCalendarService = Arc<dyn CalendarService<Error = BoxedError>>;

/// Adapts any `CalendarService` into one returning `BoxedError`.
pub struct BoxedCalendar<S> {
    inner: S,
}

impl<S: CalendarService> BoxedCalendar<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Wraps `inner` and erases it behind `DynCalendarService`.
    pub fn shared(inner: S) -> DynCalendarService
    where
        S: 'static,
    {
        Arc::new(Self::new(inner))
    }
}

fn boxed<E: StdError + Send + Sync + 'static>(err: E) -> BoxedError {
    BoxedError(Box::new(err))
}

impl<S: CalendarService> CalendarService for BoxedCalendar<S> {
    type Error = BoxedError;

    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarEvent>, Self::Error> {
        let fut = self.inner.list_events(calendar_id, time_min, time_max);
        Box::pin(async move { fut.await.map_err(boxed) })
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let fut = self.inner.insert_event(calendar_id, body);
        Box::pin(async move { fut.await.map_err(boxed) })
    }

    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let fut = self.inner.update_event(calendar_id, event_id, body);
        Box::pin(async move { fut.await.map_err(boxed) })
    }
}

impl<T: CalendarService + ?Sized> CalendarService for Arc<T> {
    type Error = T::Error;

    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarEvent>, Self::Error> {
        (**self).list_events(calendar_id, time_min, time_max)
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        (**self).insert_event(calendar_id, body)
    }

    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        body: EventBody,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        (**self).update_event(calendar_id, event_id, body)
    }
}

/// In-memory calendar used by tests across the workspace.
#[cfg(any(test, feature = "test-util"))]
pub mod memory {
    use super::*;
    use crate::models::EventStatus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    pub enum MemoryCalendarError {
        #[error("event not found: {0}")]
        NotFound(String),
        #[error("calendar unavailable")]
        Unavailable,
    }

    /// Stores events per calendar id; writes are counted so tests can assert
    /// how many times the upstream would have been called.
    #[derive(Default)]
    pub struct InMemoryCalendar {
        events: Mutex<HashMap<String, Vec<CalendarEvent>>>,
        writes: Mutex<usize>,
        failing: Mutex<bool>,
    }

    impl InMemoryCalendar {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seeds an existing event directly, bypassing the write counter.
        pub fn seed(&self, calendar_id: &str, event: CalendarEvent) {
            self.events
                .lock()
                .unwrap()
                .entry(calendar_id.to_string())
                .or_default()
                .push(event);
        }

        pub fn events(&self, calendar_id: &str) -> Vec<CalendarEvent> {
            self.events
                .lock()
                .unwrap()
                .get(calendar_id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn write_count(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        /// Makes every subsequent call fail as an unreachable upstream would.
        pub fn fail_all(&self) {
            *self.failing.lock().unwrap() = true;
        }

        fn check_available(&self) -> Result<(), MemoryCalendarError> {
            if *self.failing.lock().unwrap() {
                Err(MemoryCalendarError::Unavailable)
            } else {
                Ok(())
            }
        }

        fn to_event(id: String, body: EventBody) -> CalendarEvent {
            CalendarEvent {
                id,
                summary: Some(body.summary),
                window: body.window,
                status: EventStatus::Confirmed,
                private_properties: body.private_properties,
            }
        }
    }

    impl CalendarService for InMemoryCalendar {
        type Error = MemoryCalendarError;

        fn list_events(
            &self,
            calendar_id: &str,
            time_min: DateTime<Utc>,
            time_max: DateTime<Utc>,
        ) -> BoxFuture<'_, Vec<CalendarEvent>, Self::Error> {
            let calendar_id = calendar_id.to_string();
            Box::pin(async move {
                self.check_available()?;
                let mut found: Vec<CalendarEvent> = self
                    .events(&calendar_id)
                    .into_iter()
                    .filter(|e| e.window.start < time_max && e.window.end > time_min)
                    .collect();
                found.sort_by_key(|e| e.window.start);
                Ok(found)
            })
        }

        fn insert_event(
            &self,
            calendar_id: &str,
            body: EventBody,
        ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
            let calendar_id = calendar_id.to_string();
            Box::pin(async move {
                self.check_available()?;
                let event_id = format!("mem-{}", uuid::Uuid::new_v4());
                self.seed(&calendar_id, Self::to_event(event_id.clone(), body));
                *self.writes.lock().unwrap() += 1;
                Ok(CalendarEventResult {
                    event_id: Some(event_id),
                    status: "confirmed".to_string(),
                })
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
            Box::pin(async move {
                self.check_available()?;
                let mut events = self.events.lock().unwrap();
                let slot = events
                    .get_mut(&calendar_id)
                    .and_then(|list| list.iter_mut().find(|e| e.id == event_id))
                    .ok_or_else(|| MemoryCalendarError::NotFound(event_id.clone()))?;
                *slot = Self::to_event(event_id.clone(), body);
                *self.writes.lock().unwrap() += 1;
                Ok(CalendarEventResult {
                    event_id: Some(event_id),
                    status: "confirmed".to_string(),
                })
            })
        }
    }
}
