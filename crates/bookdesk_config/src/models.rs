// --- File: crates/bookdesk_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Scheduling Rules ---

/// Maps a package identifier to the number of live-service hours it includes.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PackageTier {
    pub id: String,
    pub live_hours: f64,
}

/// Rules shared by the Availability Engine and booking reconciliation.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchedulingConfig {
    #[serde(default = "default_prep_hours")]
    pub prep_hours: f64,
    #[serde(default = "default_clean_hours")]
    pub clean_hours: f64,
    /// Maximum bookings per calendar day. `0` disables the cap.
    #[serde(default = "default_day_cap")]
    pub day_cap: u32,
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: u32,
    /// Last bookable start hour, inclusive.
    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: u32,
    #[serde(default = "default_live_hours")]
    pub default_live_hours: f64,
    #[serde(default = "default_min_live_hours")]
    pub min_live_hours: f64,
    /// Longest bookable live service; longer requests are clamped or refused.
    #[serde(default = "default_max_live_hours")]
    pub max_live_hours: f64,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_packages")]
    pub packages: Vec<PackageTier>,
}

fn default_prep_hours() -> f64 {
    1.0
}
fn default_clean_hours() -> f64 {
    1.0
}
fn default_day_cap() -> u32 {
    2
}
fn default_business_hours_start() -> u32 {
    9
}
fn default_business_hours_end() -> u32 {
    22
}
fn default_live_hours() -> f64 {
    2.0
}
fn default_min_live_hours() -> f64 {
    1.0
}
fn default_max_live_hours() -> f64 {
    24.0
}
fn default_time_zone() -> String {
    "America/Los_Angeles".to_string()
}
fn default_packages() -> Vec<PackageTier> {
    vec![
        PackageTier {
            id: "50-150-5h".to_string(),
            live_hours: 2.0,
        },
        PackageTier {
            id: "150-250-5h".to_string(),
            live_hours: 2.5,
        },
        PackageTier {
            id: "250-350-6h".to_string(),
            live_hours: 3.0,
        },
    ]
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            prep_hours: default_prep_hours(),
            clean_hours: default_clean_hours(),
            day_cap: default_day_cap(),
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
            default_live_hours: default_live_hours(),
            min_live_hours: default_min_live_hours(),
            max_live_hours: default_max_live_hours(),
            time_zone: default_time_zone(),
            packages: default_packages(),
        }
    }
}

impl SchedulingConfig {
    /// Live hours for a package id, falling back to `default_live_hours`.
    pub fn package_hours(&self, package_id: &str) -> f64 {
        self.packages
            .iter()
            .find(|tier| tier.id == package_id)
            .map(|tier| tier.live_hours)
            .unwrap_or(self.default_live_hours)
    }

    /// Whether `hours` is a usable live-service duration: positive, finite and
    /// at most `max_live_hours`.
    pub fn accepts_live_hours(&self, hours: f64) -> bool {
        hours.is_finite() && hours > 0.0 && hours <= self.max_live_hours
    }
}

// --- Google Calendar Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// Path to a service account key file.
    pub key_path: Option<String>,
    /// Inline service account JSON, usually injected from GCAL_SERVICE_ACCOUNT_JSON.
    pub service_account_json: Option<String>,
    #[serde(default = "default_event_color_id")]
    pub event_color_id: String,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}
fn default_event_color_id() -> String {
    "7".to_string()
}

impl Default for GcalConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            key_path: None,
            service_account_json: None,
            event_color_id: default_event_color_id(),
        }
    }
}

// --- Stripe Config ---
// Secret values arrive through the "secret_from_env" marker:
// STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    pub public_url: String,
    #[serde(default = "default_stripe_currency")]
    pub currency: String,
    /// Flat amount taken off the total when the client pays in full upfront.
    #[serde(default = "default_full_payment_discount")]
    pub full_payment_discount: f64,
    #[serde(default = "default_product_name_prefix")]
    pub product_name_prefix: String,
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: i64,
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_stripe_currency() -> String {
    "usd".to_string()
}
fn default_full_payment_discount() -> f64 {
    20.0
}
fn default_product_name_prefix() -> String {
    "Booking".to_string()
}
fn default_webhook_tolerance_secs() -> i64 {
    300
}

impl StripeConfig {
    /// Redirect target after checkout, shared by success and cancel.
    pub fn return_url(&self) -> String {
        format!("{}/", self.public_url.trim_end_matches('/'))
    }
}

// --- Invoicing Rules ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaxApplies {
    BeforeDiscount,
    #[default]
    AfterDiscount,
}

impl TaxApplies {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxApplies::BeforeDiscount => "before-discount",
            TaxApplies::AfterDiscount => "after-discount",
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InvoicingConfig {
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub tax_applies: TaxApplies,
    #[serde(default = "default_due_days")]
    pub due_days: i64,
}

fn default_due_days() -> i64 {
    7
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.0,
            tax_applies: TaxApplies::default(),
            due_days: default_due_days(),
        }
    }
}

// --- Wave Config ---
// Token arrives through the "secret_from_env" marker: WAVE_TOKEN.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WaveConfig {
    pub token: Option<String>,
    pub business_id: Option<String>,
    #[serde(default = "default_wave_currency")]
    pub currency: String,
    #[serde(default = "default_wave_api_url")]
    pub api_url: String,
    pub product_id_service: Option<String>,
    pub product_id_addon: Option<String>,
    pub product_id_tax: Option<String>,
}

fn default_wave_currency() -> String {
    "USD".to_string()
}
fn default_wave_api_url() -> String {
    "https://gql.waveapps.com/graphql/public".to_string()
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            token: None,
            business_id: None,
            currency: default_wave_currency(),
            api_url: default_wave_api_url(),
            product_id_service: None,
            product_id_addon: None,
            product_id_tax: None,
        }
    }
}

// --- Logging ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// --- CORS ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,
    #[serde(default)]
    pub use_stripe: bool,
    #[serde(default)]
    pub use_wave: bool,

    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub invoicing: InvoicingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub wave: Option<WaveConfig>,
}
