// --- File: crates/bookdesk_wave/src/logic.rs ---
//! Invoice totals and the Wave invoice payload. Money is kept in integer
//! cents and only rendered as decimal strings at the edge.

use crate::error::WaveError;
use bookdesk_config::{InvoicingConfig, TaxApplies, WaveConfig};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- Money ---

pub type Cents = i64;

pub fn to_cents(amount: f64) -> Cents {
    if amount.is_finite() {
        (amount * 100.0).round() as Cents
    } else {
        0
    }
}

/// Largest magnitude accepted for any invoice amount: one billion in major
/// units. Unparsable or absurd inputs saturate in `to_cents` and land above it.
pub const MAX_CENTS: Cents = 100_000_000_000;

fn bounded(cents: Cents) -> Result<Cents, WaveError> {
    if cents.unsigned_abs() > MAX_CENTS.unsigned_abs() {
        return Err(WaveError::InvalidInput(format!(
            "Invoice amounts must be within {}",
            format_cents(MAX_CENTS)
        )));
    }
    Ok(cents)
}

/// `1234` -> `"12.34"`, `-500` -> `"-5.00"`.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// A number that may arrive as JSON number or numeric string; anything else
/// reads as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Amount(pub f64);

impl Amount {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn cents(self) -> Cents {
        to_cents(self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(Amount(parsed.filter(|n| n.is_finite()).unwrap_or(0.0)))
    }
}

// --- Request ---

/// One add-on as sent by the manager UI.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum AddOnEntry {
    Name(String),
    Priced {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        price: Amount,
    },
    Other(Value),
}

/// Add-ons arrive as a list of names, a list of `{name, price}` objects, or
/// a comma-separated string.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum AddOnsInput {
    List(Vec<AddOnEntry>),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOn {
    pub name: String,
    pub price: Cents,
}

impl AddOnsInput {
    pub fn normalize(&self) -> Vec<AddOn> {
        match self {
            AddOnsInput::List(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    AddOnEntry::Name(name) => Some(AddOn {
                        name: name.trim().to_string(),
                        price: 0,
                    }),
                    AddOnEntry::Priced { name, price } => Some(AddOn {
                        name: name.as_deref().unwrap_or_default().trim().to_string(),
                        price: price.cents(),
                    }),
                    AddOnEntry::Other(_) => None,
                })
                .collect(),
            AddOnsInput::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| AddOn {
                    name: name.to_string(),
                    price: 0,
                })
                .collect(),
            AddOnsInput::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscountMode {
    #[default]
    Amount,
    Percent,
    /// Any other value; no discount is applied.
    Unsupported,
}

impl DiscountMode {
    pub fn parse(mode: Option<&str>) -> Self {
        match mode.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("amount") => DiscountMode::Amount,
            Some("percent") => DiscountMode::Percent,
            Some(_) => DiscountMode::Unsupported,
        }
    }
}

/// Create-invoice request body. Unknown fields are ignored.
#[derive(Deserialize, Debug, Clone, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceRequest {
    /// Dispatch key on `POST /wave`; only `create-invoice` is accepted.
    pub action: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub venue: Option<String>,
    pub pkg: Option<String>,
    pub main_bar: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub addons: Option<AddOnsInput>,
    /// `amount` (default) or `percent`
    pub discount_mode: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub discount_value: Amount,
    /// Pre-tax service total
    #[cfg_attr(feature = "openapi", schema(value_type = f64, example = 650))]
    pub total: Amount,
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub deposit: Amount,
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub balance: Amount,
    pub pay_mode: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "dateISO")]
    pub date_iso: Option<String>,
    #[serde(rename = "startISO")]
    pub start_iso: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub hours: Amount,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl InvoiceRequest {
    pub fn addons(&self) -> Vec<AddOn> {
        self.addons.as_ref().map(AddOnsInput::normalize).unwrap_or_default()
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(&self.email)
    }
}

// --- Totals ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal_base: Cents,
    pub discount: Cents,
    pub taxable_base: Cents,
    pub tax: Cents,
}

/// Totals as rendered in the response.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TotalsView {
    #[cfg_attr(feature = "openapi", schema(example = "700.00"))]
    pub subtotal_base: String,
    pub discount: String,
    pub taxable_base: String,
    pub tax: String,
}

impl From<InvoiceTotals> for TotalsView {
    fn from(totals: InvoiceTotals) -> Self {
        Self {
            subtotal_base: format_cents(totals.subtotal_base),
            discount: format_cents(totals.discount),
            taxable_base: format_cents(totals.taxable_base),
            tax: format_cents(totals.tax),
        }
    }
}

fn percent_of(base: Cents, pct: f64) -> Cents {
    (base as f64 * pct / 100.0).round() as Cents
}

/// Computes the invoice totals.
///
/// `subtotal_base` is the service total plus priced add-ons. Tax is charged on
/// the subtotal before or after the discount depending on `tax_applies`, and
/// neither base goes below zero. Every input and result must stay within
/// `MAX_CENTS`, otherwise the request is invalid.
pub fn compute_totals(
    total: Cents,
    addons: &[AddOn],
    mode: DiscountMode,
    discount_value: f64,
    invoicing: &InvoicingConfig,
) -> Result<InvoiceTotals, WaveError> {
    let mut subtotal_base = bounded(total)?;
    for addon in addons {
        subtotal_base = bounded(subtotal_base + bounded(addon.price)?)?;
    }
    let discount = bounded(match mode {
        DiscountMode::Amount => to_cents(discount_value).max(0),
        DiscountMode::Percent => percent_of(subtotal_base, discount_value.max(0.0)),
        DiscountMode::Unsupported => 0,
    })?;
    let taxable_base = match invoicing.tax_applies {
        TaxApplies::BeforeDiscount => subtotal_base.max(0),
        TaxApplies::AfterDiscount => (subtotal_base - discount).max(0),
    };
    let tax = bounded((taxable_base as f64 * invoicing.tax_rate).round() as Cents)?;
    Ok(InvoiceTotals {
        subtotal_base,
        discount,
        taxable_base,
        tax,
    })
}

/// `0.0825` -> `"8.25"`, `0.1` -> `"10"`.
pub fn tax_rate_label(rate: f64) -> String {
    let pct = format!("{:.2}", rate * 100.0);
    pct.strip_suffix(".00").map(str::to_string).unwrap_or(pct)
}

// --- Invoice Payload ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: u32,
    /// Decimal string, e.g. `"650.00"`
    pub unit_price: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDiscountInput {
    pub name: String,
    pub discount_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreateInput {
    pub business_id: String,
    pub customer_id: String,
    pub currency: String,
    pub status: String,
    pub title: String,
    pub subhead: Option<String>,
    pub invoice_date: String,
    pub due_date: String,
    pub memo: String,
    pub items: Vec<InvoiceItemInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_discounts: Option<Vec<InvoiceDiscountInput>>,
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.0}", hours)
    } else {
        hours.to_string()
    }
}

pub fn build_memo(request: &InvoiceRequest, tax_applies: TaxApplies) -> String {
    let pay_mode = non_empty(&request.pay_mode).unwrap_or("deposit");
    let hours = request.hours.value();
    [
        non_empty(&request.notes).map(|n| format!("Notes: {}", n)),
        non_empty(&request.date_iso).map(|d| format!("Event Date: {}", d)),
        non_empty(&request.start_iso).map(|s| format!("Start: {}", s)),
        (hours != 0.0).then(|| format!("Service Hours: {}", format_hours(hours))),
        Some(format!("Pay mode: {}", pay_mode)),
        Some(format!("Deposit: ${}", format_cents(request.deposit.cents()))),
        Some(format!("Balance: ${}", format_cents(request.balance.cents()))),
        Some(format!("Tax applies: {}", tax_applies.as_str())),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn build_line_items(
    request: &InvoiceRequest,
    addons: &[AddOn],
    totals: &InvoiceTotals,
    wave: &WaveConfig,
    invoicing: &InvoicingConfig,
) -> Vec<InvoiceItemInput> {
    let main_bar = non_empty(&request.main_bar).unwrap_or("Service");
    let pkg = non_empty(&request.pkg)
        .map(|p| format!(" ({})", p))
        .unwrap_or_default();

    let mut items = vec![InvoiceItemInput {
        product_id: wave.product_id_service.clone(),
        description: format!("Booking - {}{}", main_bar, pkg),
        quantity: 1,
        unit_price: format_cents(request.total.cents()),
    }];
    items.extend(addons.iter().map(|addon| InvoiceItemInput {
        product_id: wave.product_id_addon.clone(),
        description: format!("Add-on - {}", addon.name),
        quantity: 1,
        unit_price: format_cents(addon.price),
    }));
    if invoicing.tax_rate > 0.0 && totals.tax > 0 {
        items.push(InvoiceItemInput {
            product_id: wave.product_id_tax.clone(),
            description: format!("Sales Tax ({}%)", tax_rate_label(invoicing.tax_rate)),
            quantity: 1,
            unit_price: format_cents(totals.tax),
        });
    }
    items
}

/// The native "Manager Discount", when one applies.
pub fn build_discount(
    mode: DiscountMode,
    discount_value: f64,
    totals: &InvoiceTotals,
) -> Option<InvoiceDiscountInput> {
    match mode {
        DiscountMode::Amount if totals.discount > 0 => Some(InvoiceDiscountInput {
            name: "Manager Discount".to_string(),
            discount_type: "FIXED".to_string(),
            amount: Some(format_cents(totals.discount)),
            percentage: None,
        }),
        DiscountMode::Percent if discount_value > 0.0 => Some(InvoiceDiscountInput {
            name: "Manager Discount".to_string(),
            discount_type: "PERCENTAGE".to_string(),
            amount: None,
            percentage: Some(discount_value),
        }),
        _ => None,
    }
}

/// Everything `invoiceCreate` needs apart from the customer id.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub totals: InvoiceTotals,
    pub items: Vec<InvoiceItemInput>,
    pub discount: Option<InvoiceDiscountInput>,
    pub subhead: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: String,
    pub memo: String,
}

pub fn draft_invoice(
    request: &InvoiceRequest,
    wave: &WaveConfig,
    invoicing: &InvoicingConfig,
    today: NaiveDate,
) -> Result<InvoiceDraft, WaveError> {
    let addons = request.addons();
    let mode = DiscountMode::parse(request.discount_mode.as_deref());
    let discount_value = request.discount_value.value();
    let totals = compute_totals(request.total.cents(), &addons, mode, discount_value, invoicing)?;

    let due_date = non_empty(&request.date_iso)
        .map(str::to_string)
        .unwrap_or_else(|| (today + Duration::days(invoicing.due_days)).to_string());

    Ok(InvoiceDraft {
        items: build_line_items(request, &addons, &totals, wave, invoicing),
        discount: build_discount(mode, discount_value, &totals),
        subhead: non_empty(&request.venue).map(|v| format!("Venue: {}", v)),
        invoice_date: today,
        due_date,
        memo: build_memo(request, invoicing.tax_applies),
        totals,
    })
}

impl InvoiceDraft {
    pub fn into_input(self, business_id: &str, customer_id: &str, currency: &str) -> InvoiceCreateInput {
        InvoiceCreateInput {
            business_id: business_id.to_string(),
            customer_id: customer_id.to_string(),
            currency: currency.to_string(),
            status: "SAVED".to_string(),
            title: "Event Booking".to_string(),
            subhead: self.subhead,
            invoice_date: self.invoice_date.to_string(),
            due_date: self.due_date,
            memo: self.memo,
            items: self.items,
            invoice_discounts: self.discount.map(|d| vec![d]),
        }
    }
}

// --- Responses ---

#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub ok: bool,
    pub invoice_id: String,
    pub view_url: Option<String>,
    pub pdf_url: Option<String>,
    pub totals: TotalsView,
}
