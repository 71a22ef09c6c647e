//! Proctored Exams API Server
//!
//! REST API for scheduling exams, running proctored attempts, judging
//! submissions and reviewing evidence.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use proctoring::{OutcomeHandle, Proctor, SessionOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

mod error;
pub mod questions;
pub mod rate_limit;
mod routes;
pub mod scoring;
pub mod settings;

pub use error::ServiceError;
pub use rate_limit::{create_governor_config, RateLimitConfig};
pub use settings::ServiceSettings;

use storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Starts one proctoring session per attempt
    pub proctor: Arc<Proctor>,
    /// Sessions by attempt id, until they have ended and their evidence is
    /// indexed, or the attempt is submitted
    pub sessions: HashMap<Uuid, OutcomeHandle>,
    /// How pruned sessions ended, for attempts not yet submitted
    pub ended: HashMap<Uuid, SessionOutcome>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Set when a Prometheus recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    pub fn new(proctor: Proctor) -> Self {
        Self {
            repository: Repository::new(),
            proctor: Arc::new(proctor),
            sessions: HashMap::new(),
            ended: HashMap::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Sessions still watching a candidate
    pub fn active_sessions(&self) -> usize {
        self.sessions.values().filter(|h| h.is_alive()).count()
    }

    /// How an attempt's session ended, whether or not its handle is kept
    pub fn session_outcome(&self, attempt: Uuid) -> Option<SessionOutcome> {
        match self.sessions.get(&attempt) {
            Some(handle) => handle.try_outcome(),
            None => self.ended.get(&attempt).cloned(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: SystemMetrics,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub exam_count: usize,
    pub attempt_count: usize,
    pub active_sessions: usize,
}

/// Create the application router without rate limiting
pub fn create_router(state: SharedState) -> Router {
    build_router(state, submission_routes())
}

/// Create the application router with per-IP limits on the join, attempt and
/// submission routes
pub fn create_limited_router(
    state: SharedState,
    limits: &RateLimitConfig,
) -> Result<Router, ServiceError> {
    let config = create_governor_config(limits)?;
    let limited = submission_routes().layer(GovernorLayer { config });
    Ok(build_router(state, limited))
}

fn submission_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/exams/:id/join", post(routes::exams::join_exam))
        .route("/api/v1/exams/:id/attempts", post(routes::attempts::begin_attempt))
        .route("/api/v1/attempts/:id/submit", post(routes::attempts::submit_attempt))
}

fn build_router(state: SharedState, submissions: Router<SharedState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route(
            "/api/v1/exams",
            get(routes::exams::list_exams).post(routes::exams::create_exam),
        )
        .route("/api/v1/attempts/:id", get(routes::attempts::get_attempt))
        .route("/api/v1/attempts/:id/evidence", get(routes::attempts::get_evidence))
        .route("/api/v1/attempts/:id/live", get(routes::live::live_frame))
        .route("/api/v1/attempts/:id/live/stream", get(routes::live::live_stream))
        .route("/api/v1/results/:user", get(routes::results::get_results))
        .route("/metrics", get(metrics_handler))
        .merge(submissions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metrics: SystemMetrics {
            exam_count: state.repository.exam_count(),
            attempt_count: state.repository.attempt_count(),
            active_sessions: state.active_sessions(),
        },
    })
}

/// Prometheus text exposition; empty when no recorder is installed
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let body = state
        .prometheus
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

/// Initialize logging
pub fn init_logging(json: bool) {
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.expect("Failed to set tracing subscriber");
}

/// Serve `app` until the listener fails
pub async fn run_server(addr: &str, app: Router) -> std::io::Result<()> {
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(state(dir.path()));
        let (status, body) = call(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["metrics"]["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_metrics_empty_without_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(state(dir.path()));
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_submission_routes_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let limits = RateLimitConfig {
            per_second: 60,
            burst_size: 2,
        };
        let app = create_limited_router(state(dir.path()), &limits).unwrap();
        let peer = SocketAddr::from(([10, 0, 0, 7], 40000));

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let mut request = Request::builder()
                .method("POST")
                .uri("/api/v1/exams/99/join")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"user":"alice","exam_code":"x"}"#))
                .unwrap();
            request.extensions_mut().insert(ConnectInfo(peer));
            statuses.push(app.clone().oneshot(request).await.unwrap().status());
        }
        assert_eq!(statuses[0], StatusCode::NOT_FOUND);
        assert_eq!(statuses[1], StatusCode::NOT_FOUND);
        assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_reads_not_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let limits = RateLimitConfig {
            per_second: 60,
            burst_size: 1,
        };
        let app = create_limited_router(state(dir.path()), &limits).unwrap();
        for _ in 0..3 {
            let (status, _) = call(&app, "GET", "/api/v1/exams", None).await;
            assert_eq!(status, StatusCode::OK);
        }
    }
}
