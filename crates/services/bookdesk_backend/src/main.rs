// File: services/bookdesk_backend/src/main.rs
use bookdesk_backend::{build_app, connect_calendar};
use bookdesk_common::init_from_config;
use bookdesk_config::load_config;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Arc::new(load_config()?);
    // Keeps the file appender flushing until shutdown.
    let _log_guard = init_from_config(&config.logging);

    let calendar = connect_calendar(&config).await;
    let app = build_app(config.clone(), calendar)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
