use std::sync::Arc;

use anyhow::Context;

use ledgerbank_api::{app, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledgerbank_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;
    let services = Arc::new(app::services::build_services(&config).await?);
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        ledger_partition = config.ledger_partition,
        serialize_debits = config.serialize_debits,
        "listening"
    );

    axum::serve(listener, router).await?;
    Ok(())
}
