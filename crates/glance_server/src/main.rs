use anyhow::Context;
use glance_logging::glance_info;
use glance_server::{build_router, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("loading configuration")?;
    glance_logging::initialize(config.log_destination, config.level_filter()?);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    glance_info!("Glance listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(&config)).await?;
    Ok(())
}
