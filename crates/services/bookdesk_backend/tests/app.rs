use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use bookdesk_backend::build_app;
use bookdesk_common::services::memory::InMemoryCalendar;
use bookdesk_common::BoxedCalendar;
use bookdesk_config::AppConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.use_gcal = true;
    config.use_stripe = true;
    config.use_wave = true;
    config
}

fn app_with_calendar(config: AppConfig, calendar: Arc<InMemoryCalendar>) -> Router {
    build_app(Arc::new(config), Some(BoxedCalendar::shared(calendar))).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = app_with_calendar(config(), Arc::new(InMemoryCalendar::new()));
    let response = send(app, Request::get("/api/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body, json!({"ok": false, "error": "Not found"}));
}

#[tokio::test]
async fn wrong_method_is_json_405() {
    let app = app_with_calendar(config(), Arc::new(InMemoryCalendar::new()));
    let response = send(
        app,
        Request::get("/api/create-booking").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body, json!({"ok": false, "error": "Method not allowed"}));
}

#[tokio::test]
async fn preflight_answers_204_with_cors_headers() {
    let app = app_with_calendar(config(), Arc::new(InMemoryCalendar::new()));
    let response = send(
        app,
        Request::options("/api/availability")
            .header(header::ORIGIN, "https://booking.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("GET") && methods.contains("POST") && methods.contains("OPTIONS"));
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type") && allowed.contains("authorization"));
    let vary = headers[header::VARY].to_str().unwrap().to_ascii_lowercase();
    assert!(vary.contains("origin"));
}

#[tokio::test]
async fn bare_options_request_is_204() {
    let app = app_with_calendar(config(), Arc::new(InMemoryCalendar::new()));
    let response = send(
        app,
        Request::options("/api/wave").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn configured_origins_are_the_only_ones_allowed() {
    let mut config = config();
    config.cors.allowed_origins = vec!["https://booking.example".to_string()];
    let calendar = Arc::new(InMemoryCalendar::new());

    let allowed = send(
        app_with_calendar(config.clone(), calendar.clone()),
        Request::get("/api/wave")
            .header(header::ORIGIN, "https://booking.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://booking.example"
    );

    let other = send(
        app_with_calendar(config, calendar),
        Request::get("/api/wave")
            .header(header::ORIGIN, "https://elsewhere.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(other
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn availability_is_served_under_api() {
    let app = app_with_calendar(config(), Arc::new(InMemoryCalendar::new()));
    let response = send(
        app,
        Request::get("/api/availability?date=2030-06-14&hours=2")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["timeZone"], "America/Los_Angeles");
    assert!(!body["slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn manual_booking_reaches_the_calendar() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let app = app_with_calendar(config(), calendar.clone());
    let response = send(
        app,
        Request::post("/api/create-booking")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "fullName": "Ana Ruiz",
                    "dateISO": "2030-06-14",
                    "startISO": "2030-06-14T23:00:00.000Z",
                    "pkg": "150-250-5h",
                    "mainBar": "Mimosa Bar"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "created");
    assert_eq!(calendar.events("primary").len(), 1);
}

#[tokio::test]
async fn without_calendar_booking_routes_are_absent() {
    let app = build_app(Arc::new(config()), None).unwrap();
    let response = send(
        app.clone(),
        Request::get("/api/availability?date=2030-06-14")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The webhook stays mounted and reports its missing configuration.
    let response = send(
        app,
        Request::post("/api/stripe/webhook")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["ok"], false);
}

#[tokio::test]
async fn disabled_features_are_not_mounted() {
    let mut config = config();
    config.use_wave = false;
    config.use_stripe = false;
    let app = build_app(Arc::new(config), None).unwrap();
    for path in ["/api/wave", "/api/generate-link"] {
        let response = send(
            app.clone(),
            Request::get(path).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}
