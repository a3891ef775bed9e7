use anyhow::Context;
use tokio::net::TcpListener;

use bikeshare_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bikeshare_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let app = bikeshare_api::app::build_app(&config).await?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
