use std::sync::Arc;

use anyhow::Context;

use pantry_api::app::{build_app, services::AppServices};
use pantry_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pantry_observability::init();

    let config = AppConfig::from_env()?;
    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize pantry store")?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
