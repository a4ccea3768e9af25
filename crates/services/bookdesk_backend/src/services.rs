// File: services/bookdesk_backend/src/services.rs
//! Connects the external services the routers share.
use bookdesk_common::DynCalendarService;
use bookdesk_config::AppConfig;
#[cfg(feature = "gcal")]
use tracing::{error, info, warn};

/// Connects the booking calendar when Google Calendar is enabled and
/// configured. Failures are logged and leave the calendar routes unmounted.
#[cfg(feature = "gcal")]
pub async fn connect_calendar(config: &AppConfig) -> Option<DynCalendarService> {
    use bookdesk_common::BoxedCalendar;
    use bookdesk_gcal::{auth::create_calendar_hub, parse_time_zone, GoogleCalendarService};
    use std::sync::Arc;

    if !config.use_gcal {
        info!("Google Calendar disabled by configuration");
        return None;
    }
    let Some(gcal) = config.gcal.as_ref() else {
        warn!("use_gcal is set but the [gcal] section is missing");
        return None;
    };
    let time_zone = match parse_time_zone(&config.scheduling.time_zone) {
        Ok(tz) => tz,
        Err(e) => {
            error!("Cannot connect Google Calendar: {}", e);
            return None;
        }
    };

    info!("Initializing Google Calendar service...");
    match create_calendar_hub(gcal).await {
        Ok(hub) => {
            let service = GoogleCalendarService::new(Arc::new(hub), time_zone);
            Some(BoxedCalendar::shared(service))
        }
        Err(e) => {
            error!("Failed to initialize Google Calendar: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "gcal"))]
pub async fn connect_calendar(_config: &AppConfig) -> Option<DynCalendarService> {
    None
}
