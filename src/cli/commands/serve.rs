use anyhow::Context;

use crate::app::{app, with_global_layers, AppState};
use crate::config;

pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Realty Gate in {:?} mode", config.environment);

    let state = AppState::from_config(config).context("failed to initialize session authority")?;
    tracing::info!(
        "Access gate {:?} using '{}' session authority",
        state.gate.enforcement(),
        state.gate.authority_name()
    );

    let router = with_global_layers(app(state), config);

    let port = port.unwrap_or(config.server.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Realty Gate listening on http://{}", bind_addr);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
