use std::{ net::SocketAddr, time::Duration };

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{ info, warn };

use recipes_logger::{ config::logging::init_logging, initialize_app, Config };

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    let addr = config.server.socket_addr()?;
    info!(environment = %config.server.environment, sink = ?config.sink.kind, "Starting recipes API");

    let (app, state, worker) = initialize_app(config);

    let listener = tokio::net::TcpListener
        ::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal()).await
        .context("Server error")?;

    // Last logger handle; once it is gone the worker drains its queue and exits.
    drop(state);
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => info!("Log sink drained"),
        Ok(Err(e)) => warn!("Log sink worker ended abnormally: {}", e),
        Err(_) => warn!("Log sink did not drain within {:?}", WORKER_DRAIN_TIMEOUT),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
