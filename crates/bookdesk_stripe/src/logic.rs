// --- File: crates/bookdesk_stripe/src/logic.rs ---
use bookdesk_common::HTTP_CLIENT;
use bookdesk_config::{SchedulingConfig, StripeConfig};
use bookdesk_fulfillment::{
    flatten_value, BookingFields, BookingMetadata, FulfillmentState, ReconcileOutcome, SkipReason,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::error::StripeError;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

// --- Data Structures ---

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct GenerateLinkResponse {
    pub ok: bool,
    #[cfg_attr(
        feature = "openapi",
        schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1...")
    )]
    pub url: String,
    #[cfg_attr(feature = "openapi", schema(example = "cs_test_a1..."))]
    pub session_id: String,
}

#[derive(Deserialize, Debug)]
struct CheckoutSessionApiResponse {
    id: String,
    url: Option<String>,
}

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEventData {
    /// Shape depends on the event type.
    pub object: Value,
}

/// Represents the outer Stripe Event object.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEvent {
    pub id: String,
    pub created: Option<i64>,
    #[serde(default)]
    pub livemode: bool,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

/// The `data.object` of a `checkout.session.completed` event.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeCheckoutSessionObject {
    pub id: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Option<BookingMetadata>,
    pub payment_status: Option<String>, // "paid", "unpaid", "no_payment_required"
}

/// Acknowledgement returned to Stripe: `{received: true, ...}`.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<String>,
}

impl WebhookAck {
    pub fn ignored(kind: impl Into<String>) -> Self {
        Self {
            received: true,
            ignored: Some(kind.into()),
            ..Default::default()
        }
    }
}

impl From<ReconcileOutcome> for WebhookAck {
    fn from(outcome: ReconcileOutcome) -> Self {
        let received = true;
        match outcome {
            ReconcileOutcome::Created { event_id } => Self {
                received,
                created: Some(true),
                event_id: Some(event_id),
                ..Default::default()
            },
            ReconcileOutcome::Updated { event_id } => Self {
                received,
                updated: Some(true),
                event_id: Some(event_id),
                ..Default::default()
            },
            ReconcileOutcome::Skipped(reason) => Self {
                received,
                skipped: Some(true),
                reason: Some(reason.as_str().to_string()),
                capacity: matches!(reason, SkipReason::Capacity).then(|| "full".to_string()),
                conflict: matches!(reason, SkipReason::Overlap).then(|| "overlap".to_string()),
                ..Default::default()
            },
        }
    }
}

// --- Webhook Signature ---

fn signing_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, StripeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`, the `v1` scheme.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, StripeError> {
    let mac = signing_mac(secret, &timestamp.to_string(), payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies the `Stripe-Signature` header of a webhook request.
///
/// Any of the listed `v1` signatures may match. The comparison is constant
/// time, and `t` must lie within `tolerance_secs` of `now_unix` (a tolerance
/// of 0 disables the check).
pub fn verify_stripe_signature(
    payload: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), StripeError> {
    let header = sig_header.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string())
    })?;

    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {} // v0 and unknown schemes
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp 't' in Stripe-Signature".to_string())
    })?;
    let parsed_timestamp = timestamp.parse::<i64>().map_err(|_| {
        StripeError::WebhookSignatureError("Invalid timestamp format in Stripe-Signature".to_string())
    })?;
    if signatures.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "Missing v1 signature in Stripe-Signature".to_string(),
        ));
    }

    if tolerance_secs > 0 && (now_unix - parsed_timestamp).abs() > tolerance_secs {
        warn!(
            "Stripe webhook timestamp outside tolerance: event {}, now {}",
            parsed_timestamp, now_unix
        );
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    let mac = signing_mac(secret, timestamp, payload)?;
    let matched = signatures
        .iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

    if matched {
        Ok(())
    } else {
        Err(StripeError::WebhookSignatureError(
            "Signature mismatch".to_string(),
        ))
    }
}

// --- Webhook Processing ---

/// Handles a verified webhook event. Only paid `checkout.session.completed`
/// events reach reconciliation; everything else is acknowledged and ignored.
pub async fn process_stripe_event(
    event: StripeEvent,
    booking: Option<&FulfillmentState>,
) -> Result<WebhookAck, StripeError> {
    info!("Processing Stripe event {} ({})", event.id, event.event_type);
    if event.event_type != CHECKOUT_COMPLETED {
        return Ok(WebhookAck::ignored(event.event_type));
    }

    let session: StripeCheckoutSessionObject = serde_json::from_value(event.data.object)?;
    if session.payment_status.as_deref() == Some("unpaid") {
        info!("Checkout session {} completed without payment", session.id);
        return Ok(WebhookAck::ignored("unpaid"));
    }

    let booking = booking.ok_or_else(|| {
        StripeError::ConfigError("Booking calendar is not configured".to_string())
    })?;
    let metadata = session.metadata.unwrap_or_default();
    let fields = BookingFields::from_metadata(&metadata, &booking.settings.rules);
    let outcome = booking.reconcile(&session.id, &fields).await?;
    Ok(WebhookAck::from(outcome))
}

// --- Payment Links ---

/// A validated payment-link request, ready to be sent to Stripe.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLink {
    pub product_name: String,
    /// Amount charged now, in the currency's minor unit.
    pub unit_amount: i64,
    pub metadata: BookingMetadata,
}

fn text(payload: &Map<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .map(|v| flatten_value(v).trim().to_string())
        .unwrap_or_default()
}

/// A loose numeric read: numbers and numeric strings, otherwise 0.
fn number(payload: &Map<String, Value>, key: &str) -> f64 {
    let parsed = match payload.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn truthy(payload: &Map<String, Value>, key: &str) -> bool {
    match payload.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "false" && s != "0",
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        _ => false,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Amount due at checkout: the total less the flat discount when paying in
/// full, otherwise the deposit. Never negative.
pub fn compute_due_now(total: f64, deposit: f64, pay_mode: &str, full_payment_discount: f64) -> f64 {
    if pay_mode == "full" {
        (total - full_payment_discount).max(0.0)
    } else {
        deposit.max(0.0)
    }
}

/// Validates a manager payment-link request and derives the amount and the
/// flat string metadata carried on the checkout session.
pub fn prepare_payment_link(
    payload: &Map<String, Value>,
    stripe: &StripeConfig,
    rules: &SchedulingConfig,
) -> Result<PaymentLink, StripeError> {
    let pkg = text(payload, "pkg");
    let main_bar = text(payload, "mainBar");
    let date_iso = text(payload, "dateISO");
    let start_iso = text(payload, "startISO");
    if [&pkg, &main_bar, &date_iso, &start_iso].iter().any(|v| v.is_empty()) {
        return Err(StripeError::MissingBookingBasics);
    }

    let total = number(payload, "total");
    let deposit = number(payload, "deposit");
    let pay_mode = Some(text(payload, "payMode"))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "deposit".to_string());
    let due_now = compute_due_now(total, deposit, &pay_mode, stripe.full_payment_discount);
    let unit_amount = (due_now * 100.0).round() as i64;
    if unit_amount <= 0 {
        return Err(StripeError::NothingDue);
    }

    let hours = Some(number(payload, "hours"))
        .filter(|h| *h > 0.0)
        .unwrap_or_else(|| rules.package_hours(&pkg));
    if !rules.accepts_live_hours(hours) {
        return Err(StripeError::InvalidHours {
            max: rules.max_live_hours,
        });
    }
    let full_name = Some(text(payload, "fullName"))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| text(payload, "name"));

    let mut metadata = BookingMetadata::new();
    for key in [
        "secondBar",
        "secondSize",
        "fountainSize",
        "fountainType",
        "addons",
        "discountApplied",
        "email",
        "phone",
        "venue",
        "setup",
        "power",
    ] {
        metadata.insert(key.to_string(), text(payload, key));
    }
    for key in ["secondEnabled", "fountainEnabled"] {
        metadata.insert(key.to_string(), truthy(payload, key).to_string());
    }
    metadata.insert("total".to_string(), format_number(total));
    metadata.insert("dueNow".to_string(), format_number(due_now));
    metadata.insert("hours".to_string(), format_number(hours));
    metadata.insert("fullName".to_string(), full_name);
    metadata.insert("payMode".to_string(), pay_mode);
    metadata.insert("managerCreated".to_string(), "true".to_string());

    let product_name = format!(
        "{} - {} ({}) - Manager Link",
        stripe.product_name_prefix, main_bar, pkg
    );
    metadata.insert("pkg".to_string(), pkg);
    metadata.insert("mainBar".to_string(), main_bar);
    metadata.insert("dateISO".to_string(), date_iso);
    metadata.insert("startISO".to_string(), start_iso);

    Ok(PaymentLink {
        product_name,
        unit_amount,
        metadata,
    })
}

/// Form fields for `POST /v1/checkout/sessions`.
pub fn checkout_form(stripe: &StripeConfig, link: &PaymentLink) -> Vec<(String, String)> {
    let return_url = stripe.return_url();
    let mut form_body: Vec<(String, String)> = vec![
        ("payment_method_types[]".to_string(), "card".to_string()),
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), return_url.clone()),
        ("cancel_url".to_string(), return_url),
        (
            "line_items[0][price_data][currency]".to_string(),
            stripe.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            link.product_name.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            link.unit_amount.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];
    form_body.extend(
        link.metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
    );
    form_body
}

fn api_error_message(body_text: &str) -> String {
    serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body_text.to_string())
}

/// Creates a Stripe Checkout Session for a prepared payment link.
pub async fn create_checkout_session(
    stripe: &StripeConfig,
    link: &PaymentLink,
) -> Result<GenerateLinkResponse, StripeError> {
    let secret_key = stripe
        .secret_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| StripeError::ConfigError("Missing STRIPE_SECRET_KEY".to_string()))?;

    let api_url = format!("{}/v1/checkout/sessions", stripe.api_base.trim_end_matches('/'));
    info!(
        "Creating Stripe Checkout Session '{}' for {} minor units",
        link.product_name, link.unit_amount
    );

    let response = HTTP_CLIENT
        .post(&api_url)
        .basic_auth(secret_key, None::<&str>)
        .form(&checkout_form(stripe, link))
        .send()
        .await?;

    let status = response.status();
    let body_text = response.text().await?;
    debug!("Stripe API response status: {}", status);

    if !status.is_success() {
        let message = api_error_message(&body_text);
        warn!("Stripe API request failed with {}: {}", status, message);
        return Err(StripeError::ApiError {
            status_code: status.as_u16(),
            message,
        });
    }

    let session: CheckoutSessionApiResponse = serde_json::from_str(&body_text)?;
    let url = session.url.ok_or_else(|| {
        StripeError::InternalError("Stripe response missing checkout URL".to_string())
    })?;
    info!("Stripe Checkout Session {} created", session.id);
    Ok(GenerateLinkResponse {
        ok: true,
        url,
        session_id: session.id,
    })
}
