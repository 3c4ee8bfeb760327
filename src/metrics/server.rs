//! HTTP endpoint serving queue metrics and a readiness probe.
//!
//! - `GET /metrics` returns the Prometheus text exposition
//! - `GET /ready` returns 200 while the queue holds at least one set, 503 otherwise
//! - `GET /snapshot` returns the last pushed [`MetricsSnapshot`] as JSON

use super::{MetricsError, MetricsRegistry, MetricsSnapshot};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors raised while serving metrics.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("metrics listener stopped: {0}")]
    Serve(String),
}

/// Listener settings for the metrics endpoint.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Listens on all interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Registry plus the most recent snapshot pushed into it.
pub struct MetricsState {
    registry: MetricsRegistry,
    last: MetricsSnapshot,
}

impl MetricsState {
    /// Records a snapshot and forwards it to the registry.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        self.registry.update(snapshot);
        self.last = snapshot.clone();
    }

    /// Prometheus text for the current registry.
    pub fn encode(&self) -> Result<String, MetricsError> {
        self.registry.encode()
    }

    /// The last snapshot pushed with [`MetricsState::update`].
    pub fn last(&self) -> &MetricsSnapshot {
        &self.last
    }
}

type SharedState = Arc<RwLock<MetricsState>>;

/// Serves a [`MetricsRegistry`] over HTTP.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: SharedState,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState {
                registry,
                last: MetricsSnapshot::default(),
            })),
        }
    }

    /// Handle used by the producer loop to push snapshots.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    fn router(state: SharedState) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/ready", get(ready_handler))
            .route("/snapshot", get(snapshot_handler))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Serves until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Serving metrics");

        axum::serve(listener, Self::router(self.state))
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    match state.read().await.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("failed to encode metrics: {}", e),
        ),
    }
}

async fn ready_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let sets = state.read().await.last().queue_sets;
    if sets > 0 {
        (StatusCode::OK, format!("{} sets available", sets))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no sets available".to_string())
    }
}

async fn snapshot_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let last = state.read().await.last().clone();
    let body = serde_json::json!({
        "queue_sets": last.queue_sets,
        "sets_written": last.sets_written,
        "sets_consumed": last.sets_consumed,
        "pool_bits_buffered": last.pool_bits_buffered,
        "bits_extracted": last.bits_extracted,
        "rejections": last.rejections,
        "frames_processed": last.frames_processed,
        "backpressure_waits": last.backpressure_waits,
    });
    ([(header::CONTENT_TYPE, "application/json")], body.to_string())
}
