use anyhow::Context;

use teamflow_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    teamflow_observability::init();

    let config = AppConfig::from_env()?;
    let app = teamflow_api::app::build_app(&config).await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        base_path = %config.base_path,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
