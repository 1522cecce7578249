use anyhow::Context;

use shopfloor_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopfloor_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let app = shopfloor_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        persistent = config.database_url.is_some(),
        utc_offset = %config.utc_offset,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
