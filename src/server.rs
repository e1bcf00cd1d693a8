use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::monitor::CertificateMonitor;

#[derive(Clone)]
pub struct AppState {
    monitor: CertificateMonitor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Status {
    pub title: String,
    pub endpoints: usize,
    pub results: usize,
    pub refresh_interval_secs: u64,
    pub updated_at: Option<String>,
}

/// JSON API over the monitor's snapshot.
///
/// - `GET /api/status` : title, counts and last update time
/// - `GET /api/certificates` : the latest snapshot
/// - `POST /api/refresh` : scan now and return the fresh snapshot
pub fn router(monitor: CertificateMonitor) -> Router {
    let state = AppState { monitor };
    let api = Router::new()
        .route("/status", get(get_status))
        .route("/certificates", get(get_certificates))
        .route("/refresh", post(post_refresh))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serve the API on `bind` until `shutdown` fires.
pub async fn spawn_server(
    bind: &str,
    monitor: CertificateMonitor,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("serving certificate snapshot on http://{}", listener.local_addr()?);
    axum::serve(listener, router(monitor))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    let snap = app.monitor.snapshot().await;
    let out = Status {
        title: app.monitor.title().to_string(),
        endpoints: app.monitor.registry().len(),
        results: snap.results.len(),
        refresh_interval_secs: app.monitor.refresh_interval().as_secs(),
        updated_at: snap.updated_at,
    };
    (StatusCode::OK, Json(out))
}

async fn get_certificates(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.monitor.snapshot().await))
}

async fn post_refresh(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.monitor.refresh().await))
}
