use anyhow::Result;
use axum::serve;
use sentinel_core::{config::AppConfig, middleware::RateLimiter, storage};
use server::app::{create_app, AppState};
use std::{net::SocketAddr, sync::Arc};
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` wins when set; otherwise `logging.level` applies to this workspace's crates.
fn init_logging(config: &AppConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" {
            EnvFilter::new("warn,sentinel_core=debug,server=debug")
        } else if env_filter == "trace" {
            EnvFilter::new("warn,sentinel_core=trace,server=trace,tower_http=trace")
        } else {
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn,sentinel_core=debug,server=debug"))
        }
    } else {
        let level = &config.logging.level;
        EnvFilter::try_new(format!("warn,sentinel_core={level},server={level}"))
            .unwrap_or_else(|_| EnvFilter::new("warn,sentinel_core=info,server=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration load failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!(environment = %config.environment, "Starting Sentinel");
    debug!(
        limiter_enabled = config.limiter.enabled,
        requests_per_second = config.limiter.requests_per_second,
        burst = config.limiter.burst,
        "Configuration loaded"
    );

    let pool = storage::connect(&config.database.url, config.database.max_connections)
        .await
        .map_err(|e| anyhow::anyhow!("Database connection failed: {e}"))?;
    storage::init_schema(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Schema initialization failed: {e}"))?;
    info!(max_connections = config.database.max_connections, "Database pool established");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let rate_limiter = Arc::new(RateLimiter::from_config(&config.limiter));
    let sweeper_handle = rate_limiter.start_sweeper(shutdown_tx.subscribe());

    let state = AppState::from_pool(pool.clone(), config.query_timeout(), &config.environment);
    let app = create_app(state, rate_limiter, config.request_timeout());

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Sentinel server listening");

    if let Err(e) = serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error occurred");
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = sweeper_handle.await {
        error!(error = %e, "Rate limiter sweeper did not stop cleanly");
    }
    pool.close().await;
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(
                error = %e,
                "Failed to install Ctrl+C handler"
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(
                    error = %e,
                    "Failed to install signal handler"
                );

                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
