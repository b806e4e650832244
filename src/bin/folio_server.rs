//! folio-server: REST API over the post stores
//!
//! ## Architecture
//! ```text
//! [HTTP client] -> [axum router] -> [PostService] -> [PRIMARY_KV store]
//!                                        |        -> [PRIMARY_ORM store]
//!                                        v
//!                                  [response cache]
//! ```
//!
//! ## Configuration
//! - FOLIO_CONFIG: YAML config file (or `--config <path>`)
//! - FOLIO__<SECTION>__<KEY>: per-key overrides, e.g. FOLIO__SERVER__PORT
//! - DATABASE_PROVIDER: default backend directive
//! - FOLIO_LOG: tracing filter (default: info)

use tracing::{error, info};

use folio::api::{self, AppState};
use folio::cache::init_cache;
use folio::config::Config;
use folio::services::PostService;
use folio::storage::init_backends;
use folio::utils::bootstrap::{connect_with_retry, init_tracing, parse_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        default_backend = %config.storage.default_backend,
        kv = ?config.storage.kv,
        orm = ?config.storage.orm,
        cache = ?config.cache.cache_type,
        "starting folio-server"
    );

    let addr = config.server.bind_addr()?;

    let backends = connect_with_retry("storage", || init_backends(&config.storage)).await?;
    let cache = connect_with_retry("cache", || init_cache(&config.cache)).await?;

    let service = PostService::new(backends, cache, config.cache.ttl());
    let state = AppState::new(service, config.storage.clone());

    api::serve(state, addr)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;

    info!("folio-server stopped");
    Ok(())
}
