use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use roomd::clock::SystemClock;
use roomd::config::ScheduleConfig;
use roomd::engine::Engine;
use roomd::notify::NotifyHub;
use roomd::store::MemoryStore;
use roomd::{http, observability, sweeper};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("ROOMD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    observability::init(metrics_port);

    let port = std::env::var("ROOMD_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("ROOMD_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let sweep_interval_secs: u64 = std::env::var("ROOMD_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);
    let config = ScheduleConfig::from_env();

    let store = Arc::new(MemoryStore::new());
    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(
        store,
        Arc::new(SystemClock),
        config.clone(),
        notify,
    ));

    let sweep_engine = engine.clone();
    tokio::spawn(async move {
        sweeper::run_sweeper(sweep_engine, Duration::from_secs(sweep_interval_secs)).await;
    });

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("roomd listening on {addr}");
    info!("  timezone: {}", config.timezone);
    info!(
        "  operating window: {}-{}",
        roomd::model::minutes_to_str(config.open),
        roomd::model::minutes_to_str(config.close)
    );
    info!("  sweep interval: {sweep_interval_secs}s");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight
    // requests.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };

    axum::serve(listener, http::router(engine))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("roomd stopped");
    Ok(())
}
