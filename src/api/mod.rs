//! REST API.
//!
//! Endpoints:
//! - `GET /api/health`: liveness
//! - `GET /api/database`: store behind the request's backend directive
//! - `GET|POST /api/posts`: list (paged with `limit` and `nextToken`), create
//! - `GET|PATCH|DELETE /api/posts/{id}`: read, partial update, delete
//!
//! Every endpoint except health honors the `X-Database-Provider` header.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::{resolve, BackendDirective, DATABASE_PROVIDER_HEADER};
use crate::config::StorageConfig;
use crate::services::PostService;
use crate::utils::bootstrap::shutdown_signal;

mod error;
mod posts;

pub use error::{status_for, ApiError, ErrorBody};
pub use posts::ListQuery;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PostService>,
    /// Directive for requests without an `X-Database-Provider` header.
    pub default_backend: BackendDirective,
    /// Storage configuration, reported by `GET /api/database`.
    pub storage: Arc<StorageConfig>,
}

impl AppState {
    pub fn new(service: PostService, storage: StorageConfig) -> Self {
        Self {
            service: Arc::new(service),
            default_backend: storage.default_backend,
            storage: Arc::new(storage),
        }
    }
}

/// Resolved backend directive plus the request path for error bodies.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub directive: BackendDirective,
    pub path: String,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();

        let requested = parts
            .headers
            .get(DATABASE_PROVIDER_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        match resolve(requested.as_deref(), state.default_backend) {
            Ok(directive) => Ok(Self { directive, path }),
            Err(e) => Err(ApiError::bad_request(e.to_string(), path)),
        }
    }
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(posts::health))
        .route("/api/database", get(posts::database_info))
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl+C or SIGTERM.
///
/// When the port is 0, the OS assigns an ephemeral port. The actual bound
/// address is always logged.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "folio REST API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
