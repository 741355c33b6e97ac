// src/main.rs
use anyhow::Result;
use healthgate::{
    config,
    health::HealthCheckService,
    metrics::MetricsRegistry,
    server::{HealthHandler, MetricsHandler, ServerBuilder},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthgate=info".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "healthgate.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    let registry = config::build_registry(&config)?;
    let mut service = HealthCheckService::new(registry);

    // Start metrics server if enabled
    if config.metrics.enabled {
        let metrics_registry = Arc::new(MetricsRegistry::new()?);
        service = service.with_metrics(metrics_registry.collector());

        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, &config.metrics.path);
    }

    let handler = HealthHandler::new(
        Arc::new(service),
        &config.server.path,
        config.health.timeout(),
    );

    let addr = config.server.addr()?;
    info!(
        "Serving health endpoint on http://{}{}",
        addr, config.server.path
    );

    ServerBuilder::new(addr)
        .with_handler(handler)
        .with_shutdown(shutdown_signal())
        .serve()
        .await?;

    info!("healthgate stopped");
    Ok(())
}

fn start_metrics_server(addr: SocketAddr, registry: Arc<MetricsRegistry>, path: &str) {
    let handler = MetricsHandler::new(registry, path);
    info!("Metrics server listening on http://{}{}", addr, path);

    tokio::spawn(async move {
        if let Err(e) = ServerBuilder::new(addr).with_handler(handler).serve().await {
            error!("Metrics server error: {:#}", e);
        }
    });
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
