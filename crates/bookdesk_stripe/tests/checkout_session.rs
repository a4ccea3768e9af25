use bookdesk_config::{SchedulingConfig, StripeConfig};
use bookdesk_stripe::{create_checkout_session, prepare_payment_link, StripeError};
use serde_json::{json, Map, Value};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stripe_config(api_base: String) -> StripeConfig {
    StripeConfig {
        secret_key: Some("sk_test_123".to_string()),
        webhook_secret: None,
        api_base,
        public_url: "https://bookings.example.com".to_string(),
        currency: "usd".to_string(),
        full_payment_discount: 20.0,
        product_name_prefix: "Booking".to_string(),
        webhook_tolerance_secs: 300,
    }
}

fn request() -> Map<String, Value> {
    let Value::Object(map) = json!({
        "pkg": "250-350-6h",
        "mainBar": "Taco Bar",
        "dateISO": "2025-07-04",
        "startISO": "2025-07-04T19:00:00.000Z",
        "total": 900,
        "payMode": "full",
        "fullName": "Kim Park"
    }) else {
        unreachable!()
    };
    map
}

#[tokio::test]
async fn creates_checkout_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_abc",
            "url": "https://checkout.stripe.com/c/pay/cs_test_abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stripe = stripe_config(server.uri());
    let link = prepare_payment_link(&request(), &stripe, &SchedulingConfig::default()).unwrap();
    let response = create_checkout_session(&stripe, &link).await.unwrap();
    assert!(response.ok);
    assert_eq!(response.session_id, "cs_test_abc");
    assert_eq!(response.url, "https://checkout.stripe.com/c/pay/cs_test_abc");

    let received = server.received_requests().await.unwrap();
    let form: Vec<(String, String)> = serde_urlencoded::from_bytes(&received[0].body).unwrap();
    let get = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    assert_eq!(get("line_items[0][price_data][unit_amount]"), "88000");
    assert_eq!(get("metadata[hours]"), "3");
    assert_eq!(get("metadata[payMode]"), "full");
    assert_eq!(get("metadata[fullName]"), "Kim Park");
}

#[tokio::test]
async fn stripe_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid API Key provided: sk_test_***123"}
        })))
        .mount(&server)
        .await;

    let stripe = stripe_config(server.uri());
    let link = prepare_payment_link(&request(), &stripe, &SchedulingConfig::default()).unwrap();
    let err = create_checkout_session(&stripe, &link).await.unwrap_err();
    match err {
        StripeError::ApiError { status_code, message } => {
            assert_eq!(status_code, 400);
            assert_eq!(message, "Invalid API Key provided: sk_test_***123");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_secret_key_is_a_config_error() {
    let mut stripe = stripe_config("http://127.0.0.1:9".to_string());
    stripe.secret_key = None;
    let link = prepare_payment_link(&request(), &stripe, &SchedulingConfig::default()).unwrap();
    let err = create_checkout_session(&stripe, &link).await.unwrap_err();
    assert!(matches!(err, StripeError::ConfigError(_)));
}
