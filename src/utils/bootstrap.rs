//! Bootstrap utilities for the folio server.

use std::future::Future;
use std::time::Duration;

use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the FOLIO_LOG environment variable.
///
/// Defaults to "info" level if FOLIO_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Config file path from `--config <path>` or `--config=<path>`.
pub fn parse_config_path() -> Option<String> {
    config_path_from_args(std::env::args().skip(1))
}

fn config_path_from_args(args: impl IntoIterator<Item = String>) -> Option<String> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

/// Run `connect` until it succeeds, with exponential backoff.
///
/// # Arguments
/// * `service_name` - Human-readable name for logging (e.g., "mongodb", "redis")
/// * `connect` - Async function that attempts to establish a connection
///
/// # Returns
/// The connection on success, or the last error after max retries.
pub async fn connect_with_retry<T, E, F, Fut>(service_name: &str, connect: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    connect_with_backoff(service_name, connect, 30, Duration::from_millis(100)).await
}

async fn connect_with_backoff<T, E, F, Fut>(
    service_name: &str,
    connect: F,
    max_retries: u32,
    initial_delay: Duration,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    const MAX_DELAY: Duration = Duration::from_secs(5);

    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match connect().await {
            Ok(conn) => {
                tracing::info!("Connected to {}", service_name);
                return Ok(conn);
            }
            Err(e) if attempt < max_retries => {
                warn!(
                    "Failed to connect to {} (attempt {}/{}): {}. Retrying in {:?}...",
                    service_name, attempt, max_retries, e, delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, MAX_DELAY);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to {} after {} attempts: {}",
                    service_name,
                    max_retries,
                    e
                );
                return Err(e);
            }
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
