// Main entry point - Dependency injection, monitor loop and HTTP surface
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::link_session::LinkSession;
use crate::application::monitor_service::MonitorService;
use crate::application::telemetry_engine::TelemetryEngine;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::serial_transport::SerialPortTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear, decrease_plot, get_snapshot, health_check, increase_plot, list_ports, select_port,
    send_command, stream_snapshots,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_monitor_config()?;
    let addr = config.bind_addr()?;

    // Transport adapter (infrastructure layer)
    let transport = Arc::new(SerialPortTransport::new(config.read_timeout()));

    // Engine and monitor loop (application layer)
    let link = LinkSession::new(config.serial.port.clone(), config.serial.baud_rate);
    let engine = TelemetryEngine::new(link, config.engine_options(), config.plot_range());
    let (service, monitor) = MonitorService::new(engine, transport, config.timing());

    // One stop signal for both the monitor loop and the server; stopping the monitor
    // also ends open snapshot streams so graceful shutdown can complete
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let mut monitor_stop = stop_rx.clone();
    let mut server_stop = stop_rx;
    let monitor_task = tokio::spawn(service.run(async move {
        let _ = monitor_stop.wait_for(|stopped| *stopped).await;
    }));
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            // Keep the sender alive so the service keeps running
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
        let _ = stop_tx.send(true);
    });

    // Build router (presentation layer)
    let state = Arc::new(AppState { monitor });
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/snapshot", get(get_snapshot))
        .route("/snapshot/stream", get(stream_snapshots))
        .route("/clear", post(clear))
        .route("/commands/:kind", post(send_command))
        .route("/ports", get(list_ports))
        .route("/port", put(select_port))
        .route("/plot/increase", post(increase_plot))
        .route("/plot/decrease", post(decrease_plot))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!(
        "Monitoring {} at {} baud, serving on {}",
        config.serial.port,
        config.serial.baud_rate,
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            let _ = server_stop.wait_for(|stopped| *stopped).await;
        })
        .await?;

    // The monitor releases the serial handle on its way out
    monitor_task.await?;

    Ok(())
}
