//! HTTP surface: health, snapshot and live log tail.

mod stream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::controller::{ActivityLog, Sampler};
use crate::error::Result;
use crate::hub::LogHub;
use crate::model::MetricSnapshot;

pub const MONITOR_PATH: &str = "/monitor";
pub const LOGS_PATH: &str = "/logs";

#[derive(Clone, Debug)]
pub struct ServerSettings {
    /// Buffered lines replayed to a new log viewer.
    pub replay_lines: usize,
    /// How long a log viewer waits for new lines before looping.
    pub stream_wait: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            replay_lines: 60,
            stream_wait: Duration::from_secs(10),
        }
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    sampler: Arc<Sampler>,
    hub: Arc<LogHub>,
    activity: Arc<ActivityLog>,
    settings: ServerSettings,
}

impl AppState {
    pub fn new(sampler: Arc<Sampler>, hub: Arc<LogHub>, settings: ServerSettings) -> Self {
        Self {
            sampler,
            hub,
            activity: Arc::new(ActivityLog::default()),
            settings,
        }
    }
}

/// Build the router. Every response carries permissive CORS headers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_health).options(handle_preflight))
        .route("/health", get(handle_health).options(handle_preflight))
        .route(MONITOR_PATH, get(handle_monitor).options(handle_preflight))
        .route(LOGS_PATH, get(stream::handle_logs).options(handle_preflight))
        .fallback(handle_fallback)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` and serve until the listener fails.
pub async fn run(host: &str, port: u16, state: AppState) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("agent start http://{addr}{MONITOR_PATH} (logs: {LOGS_PATH})");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "ts": Utc::now().timestamp_millis() }))
}

async fn handle_monitor(State(state): State<AppState>) -> Json<MetricSnapshot> {
    let sampler = Arc::clone(&state.sampler);
    // sampling sleeps through its CPU window; keep it off the async workers
    let snapshot = match tokio::task::spawn_blocking(move || sampler.snapshot()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "sampling task failed");
            state.sampler.empty_snapshot()
        }
    };
    state.activity.record(&snapshot);
    Json(snapshot)
}

async fn handle_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn handle_fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}
