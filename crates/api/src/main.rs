use std::sync::Arc;

use anyhow::Context;

use seniorcare_api::app::{AppServices, build_app};
use seniorcare_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_with_dotenv().context("loading configuration")?;

    seniorcare_observability::init_with(&config.log.settings());

    let services = AppServices::from_config(&config)
        .await
        .context("initializing storage")?;
    let app = build_app(Arc::new(services));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
