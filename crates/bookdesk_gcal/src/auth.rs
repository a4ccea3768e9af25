// File: crates/bookdesk_gcal/src/auth.rs
use bookdesk_config::GcalConfig;
use google_calendar3::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    yup_oauth2::{
        parse_service_account_key, read_service_account_key, ServiceAccountAuthenticator,
        ServiceAccountKey,
    },
    CalendarHub,
};
use std::{error::Error, path::Path};
use tracing::info;

type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HubType = CalendarHub<Connector>;

/// Keys pasted into an environment variable often carry literal `\n`
/// sequences instead of line breaks.
pub fn normalize_private_key(key: &str) -> String {
    key.replace("\\r\\n", "\n").replace("\\n", "\n")
}

async fn service_account_key(
    config: &GcalConfig,
) -> Result<ServiceAccountKey, Box<dyn Error + Send + Sync>> {
    if let Some(json) = config
        .service_account_json
        .as_deref()
        .filter(|j| !j.trim().is_empty())
    {
        info!("Using Google service account from inline JSON");
        let mut key = parse_service_account_key(json)?;
        key.private_key = normalize_private_key(&key.private_key);
        return Ok(key);
    }

    let key_path = config
        .key_path
        .as_deref()
        .ok_or("Missing service_account_json or key_path in GcalConfig")?;
    info!("Using Google service account key file {}", key_path);
    Ok(read_service_account_key(Path::new(key_path)).await?)
}

pub async fn create_calendar_hub(
    config: &GcalConfig,
) -> Result<HubType, Box<dyn Error + Send + Sync>> {
    let sa_key = service_account_key(config).await?;

    let auth = ServiceAccountAuthenticator::builder(sa_key).build().await?;

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()?
        .https_or_http()
        .enable_http1()
        .build();

    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https);

    Ok(CalendarHub::new(client, auth))
}
