//! HTTP API gateway for Brainstem.
//!
//! The engine's thin operational surface:
//!
//! - `GET  /health`             — liveness
//! - `POST /api/v1/coordinate`  — run one request through the engine
//! - `GET  /api/v1/metrics`     — resource metrics snapshot (optionally windowed)
//! - `GET  /api/v1/workflows`   — registered intents
//! - `GET  /api/v1/status`      — registry and uptime overview
//!
//! Built on Axum. `start()` is the composition root: it wires config →
//! agents → registry → scheduler → service and owns the background
//! tasks (cache sweeper, persistence worker).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use brainstem_agents::{AgentRegistry, ClassifierRouter};
use brainstem_cache::ResponseCache;
use brainstem_coordinator::{
    ContextPruner, CoordinationService, FinalResponse, PersistQueue, Scheduler, WorkflowRegistry,
};
use brainstem_core::Error;
use brainstem_metrics::ResourceMetrics;
use brainstem_state::InMemoryStateStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub service: CoordinationService,
    pub metrics: Arc<ResourceMetrics>,
    pub agents: Arc<AgentRegistry>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/coordinate", post(coordinate_handler))
        .route("/api/v1/metrics", get(metrics_handler))
        .route("/api/v1/workflows", get(workflows_handler))
        .route("/api/v1/status", get(status_handler))
        .layer(axum::extract::DefaultBodyLimit::max(256 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds every subsystem once and shares them via `Arc`.
pub async fn start(config: brainstem_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let agents = Arc::new(brainstem_agents::build_from_config(&config));

    let router_agent = agents.get(&config.intent.agent).ok_or_else(|| {
        format!(
            "intent router agent '{}' is not configured",
            config.intent.agent
        )
    })?;
    let intent_router = Arc::new(ClassifierRouter::new(router_agent, &config.intent.action));

    let workflows = Arc::new(WorkflowRegistry::from_config(&config, &agents)?);

    let cache = Arc::new(ResponseCache::new(config.cache.capacity));
    let _sweeper = cache.spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));

    let metrics = Arc::new(ResourceMetrics::new());
    let pruner = Arc::new(ContextPruner::from_config(&config.pruning));

    let scheduler = Scheduler::new(agents.clone(), cache, metrics.clone(), pruner);

    let store = Arc::new(InMemoryStateStore::new());
    let (persist, _worker) = PersistQueue::start(store.clone(), config.persistence.queue_capacity);

    let service = CoordinationService::new(intent_router, workflows, scheduler, store, persist)
        .with_confidence_floor(config.intent.confidence_floor);

    let state = Arc::new(GatewayState {
        service,
        metrics,
        agents,
        start_time: chrono::Utc::now(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct CoordinateRequest {
    /// Existing conversation ID (omit to start a new conversation).
    #[serde(default)]
    conversation_id: Option<String>,
    /// The user's message.
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn coordinate_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CoordinateRequest>,
) -> Result<Json<FinalResponse>, (StatusCode, Json<ErrorResponse>)> {
    let conversation_id = payload
        .conversation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    match state.service.handle(&conversation_id, &payload.message).await {
        Ok(response) => Ok(Json(response)),
        Err(Error::Structural(e)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
        Err(e) => {
            error!(error = %e, "Coordination failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

#[derive(Deserialize)]
struct MetricsQuery {
    /// Restrict the snapshot to the trailing window, in seconds.
    #[serde(default)]
    window_secs: Option<i64>,
}

async fn metrics_handler(
    State(state): State<SharedState>,
    Query(query): Query<MetricsQuery>,
) -> Json<brainstem_metrics::UsageSnapshot> {
    let window = query.window_secs.map(chrono::Duration::seconds);
    Json(state.metrics.snapshot(window))
}

#[derive(Serialize)]
struct WorkflowListResponse {
    intents: Vec<String>,
    count: usize,
}

async fn workflows_handler(State(state): State<SharedState>) -> Json<WorkflowListResponse> {
    let intents: Vec<String> = state
        .service
        .workflows()
        .intents()
        .into_iter()
        .map(String::from)
        .collect();
    let count = intents.len();
    Json(WorkflowListResponse { intents, count })
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    workflows: usize,
    agents: Vec<String>,
    uptime_secs: i64,
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        workflows: state.service.workflows().len(),
        agents: state.agents.names().into_iter().map(String::from).collect(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
