// File: services/bookdesk_backend/src/app.rs
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use bookdesk_common::{method_not_allowed, not_found, BookdeskError, DynCalendarService};
use bookdesk_config::{AppConfig, CorsConfig};
use http::{header, HeaderValue, Method, StatusCode};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Assembles every enabled feature router under `/api`.
///
/// `calendar` is the connected booking calendar; without one the
/// availability, manual booking and webhook reconciliation paths are not
/// served (the webhook still acknowledges events it would ignore).
pub fn build_app(
    config: Arc<AppConfig>,
    calendar: Option<DynCalendarService>,
) -> Result<Router, BookdeskError> {
    #[cfg(feature = "gcal")]
    let booking = match calendar.clone() {
        Some(calendar) => Some(bookdesk_fulfillment::fulfillment_state(&config, calendar)?),
        None => None,
    };
    #[cfg(not(feature = "gcal"))]
    let _ = calendar;

    let api_router = {
        #[allow(unused_mut)] // for the features it needs to be mutable
        let mut router = Router::new();
        #[cfg(feature = "gcal")]
        if let (Some(calendar), Some(booking)) = (calendar, booking.clone()) {
            info!("Mounting availability and manual booking routes");
            router = router
                .merge(bookdesk_gcal::routes::routes(config.clone(), calendar))
                .merge(bookdesk_fulfillment::routes(booking));
        }
        #[cfg(feature = "stripe")]
        if config.use_stripe {
            info!("Mounting Stripe routes");
            router = router.merge(bookdesk_stripe::routes(config.clone(), booking));
        }
        #[cfg(feature = "wave")]
        if config.use_wave {
            info!("Mounting Wave routes");
            router = router.merge(bookdesk_wave::routes(config.clone()));
        }
        router
    };

    #[allow(unused_mut)]
    let mut app = Router::new().nest("/api", api_router);

    #[cfg(feature = "openapi")]
    {
        app = app.merge(swagger_ui());
    }

    Ok(app
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(cors_layer(&config.cors))
        .layer(middleware::from_fn(answer_preflight)))
}

/// `*` when no origins are configured, otherwise exactly the listed ones.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let allow_origin = if cors.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .vary([header::ORIGIN])
}

/// Every OPTIONS request ends as an empty 204 carrying the CORS headers.
async fn answer_preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }
    let (mut parts, _) = next.run(request).await.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}

#[cfg(feature = "openapi")]
fn swagger_ui() -> utoipa_swagger_ui::SwaggerUi {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    #[derive(OpenApi)]
    #[openapi(
        info(
            title = "Bookdesk API",
            version = "0.1.0",
            description = "Booking, payment and invoicing endpoints"
        ),
        tags((name = "Bookdesk", description = "Core service endpoints")),
        servers((url = "/api", description = "Main API Prefix")),
    )]
    struct ApiDoc;

    #[allow(unused_mut)] // for the features it needs to be mutable
    let mut openapi_doc = ApiDoc::openapi();
    #[cfg(feature = "gcal")]
    {
        openapi_doc.merge(bookdesk_gcal::doc::GcalApiDoc::openapi());
        openapi_doc.merge(bookdesk_fulfillment::doc::FulfillmentApiDoc::openapi());
    }
    #[cfg(feature = "stripe")]
    openapi_doc.merge(bookdesk_stripe::doc::StripeApiDoc::openapi());
    #[cfg(feature = "wave")]
    openapi_doc.merge(bookdesk_wave::doc::WaveApiDoc::openapi());

    info!("Adding Swagger UI at /api/docs");
    SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc)
}
