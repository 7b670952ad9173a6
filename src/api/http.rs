use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing::{debug, info};

use crate::cache::{CacheStats, QueryCache};
use crate::config::Config;
use crate::error::OracleError;
use crate::oracle::{Oracle, OracleStats};

/// Shared server state. The oracle is wrapped in a `RwLock<Arc<Oracle>>`
/// (not a bare `Arc<Oracle>`) so a future rebuild can swap the whole
/// oracle atomically between reads; `query` itself never touches the
/// lock beyond the initial clone of the `Arc`, so queries stay lock-free.
#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<RwLock<Arc<Oracle>>>,
    #[allow(dead_code)] // reserved for config-driven HTTP behavior (e.g. response limits)
    pub config: Arc<Config>,
    pub cache: Arc<QueryCache>,
}

impl AppState {
    fn current_oracle(&self) -> Arc<Oracle> {
        self.oracle.read().clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct DistanceQueryParams {
    pub s: String,
    pub t: String,
    #[serde(default)]
    pub bypass_cache: bool,
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    pub s: String,
    pub t: String,
    pub distance: u32,
}

#[derive(Debug, Deserialize)]
pub struct BatchDistanceRequest {
    pub s: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub bypass_cache: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchDistanceEntry {
    pub t: String,
    pub distance: Option<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchDistanceResponse {
    pub s: String,
    pub results: Vec<BatchDistanceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BallQueryParams {
    pub c: String,
}

#[derive(Debug, Serialize)]
pub struct BallResponse {
    pub center: String,
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BallContainsParams {
    pub c: String,
    pub v: String,
}

#[derive(Debug, Serialize)]
pub struct BallContainsResponse {
    pub center: String,
    pub vertex: String,
    pub contains: bool,
}

#[derive(Debug, Deserialize)]
pub struct LandmarkDistanceParams {
    pub landmark: String,
    pub v: String,
}

#[derive(Debug, Serialize)]
pub struct LandmarkDistanceResponse {
    pub landmark: String,
    pub vertex: String,
    pub distance: u32,
}

#[derive(Debug, Serialize)]
pub struct LandmarksResponse {
    pub landmarks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub oracle: OracleStats,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    fn internal(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }

    fn from_oracle_error(err: OracleError) -> Self {
        let code = match &err {
            OracleError::UnknownVertex(_) => "UNKNOWN_VERTEX",
            OracleError::NotACenter(_) => "NOT_A_CENTER",
            OracleError::NotALandmark(_) => "NOT_A_LANDMARK",
            OracleError::DisconnectedGraph => "DISCONNECTED_GRAPH",
            OracleError::EmptyLandmarkSet { .. } => "EMPTY_LANDMARK_SET",
            OracleError::InvalidParameter { .. } => "INVALID_PARAMETER",
        };
        Self {
            error: err.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "UNKNOWN_VERTEX" | "NOT_A_CENTER" | "NOT_A_LANDMARK" => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(self)).into_response()
    }
}

/// Looks up a cached distance for `(s, t)` by resolving both tokens to
/// indices first. Resolution failures fall through to the uncached path,
/// where `Oracle::query` reports the precise `UnknownVertex` error.
fn cached_distance(oracle: &Oracle, cache: &QueryCache, s: &str, t: &str) -> Option<u32> {
    let s_idx = oracle.index_of(s)?;
    let t_idx = oracle.index_of(t)?;
    cache.get(s_idx, t_idx)
}

fn store_cached_distance(oracle: &Oracle, cache: &QueryCache, s: &str, t: &str, distance: u32) {
    if let (Some(s_idx), Some(t_idx)) = (oracle.index_of(s), oracle.index_of(t)) {
        cache.insert(s_idx, t_idx, distance);
    }
}

pub async fn get_distance(
    State(state): State<AppState>,
    Query(params): Query<DistanceQueryParams>,
) -> Result<Json<DistanceResponse>, ErrorResponse> {
    let oracle = state.current_oracle();

    if !params.bypass_cache {
        if let Some(distance) = cached_distance(&oracle, &state.cache, &params.s, &params.t) {
            debug!(s = %params.s, t = %params.t, "distance cache hit");
            return Ok(Json(DistanceResponse {
                s: params.s,
                t: params.t,
                distance,
            }));
        }
    }

    let oracle_for_blocking = oracle.clone();
    let s = params.s.clone();
    let t = params.t.clone();
    let distance = tokio::task::spawn_blocking(move || oracle_for_blocking.query(&s, &t))
        .await
        .map_err(|e| ErrorResponse::internal(e.to_string()))?
        .map_err(ErrorResponse::from_oracle_error)?;

    store_cached_distance(&oracle, &state.cache, &params.s, &params.t, distance);
    debug!(s = %params.s, t = %params.t, distance, "distance cache miss, computed");

    Ok(Json(DistanceResponse {
        s: params.s,
        t: params.t,
        distance,
    }))
}

pub async fn batch_distance(
    State(state): State<AppState>,
    Json(request): Json<BatchDistanceRequest>,
) -> Result<Json<BatchDistanceResponse>, ErrorResponse> {
    const MAX_TARGETS: usize = 500;
    if request.targets.len() > MAX_TARGETS {
        return Err(ErrorResponse {
            error: format!("at most {MAX_TARGETS} targets allowed per batch"),
            code: "TOO_MANY_TARGETS".to_string(),
        });
    }

    let oracle = state.current_oracle();
    let bypass_cache = request.bypass_cache;
    let s = request.s.clone();

    let oracle_for_blocking = oracle.clone();
    let cache = state.cache.clone();
    let targets = request.targets.clone();

    let results = tokio::task::spawn_blocking(move || {
        targets
            .into_iter()
            .map(|t| {
                if !bypass_cache {
                    if let Some(distance) = cached_distance(&oracle_for_blocking, &cache, &s, &t) {
                        return BatchDistanceEntry {
                            t,
                            distance: Some(distance),
                            error: None,
                        };
                    }
                }
                match oracle_for_blocking.query(&s, &t) {
                    Ok(distance) => {
                        store_cached_distance(&oracle_for_blocking, &cache, &s, &t, distance);
                        BatchDistanceEntry {
                            t,
                            distance: Some(distance),
                            error: None,
                        }
                    }
                    Err(err) => BatchDistanceEntry {
                        t,
                        distance: None,
                        error: Some(err.to_string()),
                    },
                }
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| ErrorResponse::internal(e.to_string()))?;

    Ok(Json(BatchDistanceResponse {
        s: request.s,
        results,
    }))
}

pub async fn get_landmarks(State(state): State<AppState>) -> Json<LandmarksResponse> {
    let oracle = state.current_oracle();
    Json(LandmarksResponse {
        landmarks: oracle.landmarks().map(|s| s.to_string()).collect(),
    })
}

pub async fn get_ball(
    State(state): State<AppState>,
    Query(params): Query<BallQueryParams>,
) -> Result<Json<BallResponse>, ErrorResponse> {
    let oracle = state.current_oracle();
    let members = oracle
        .ball(&params.c)
        .map_err(ErrorResponse::from_oracle_error)?
        .map(|s| s.to_string())
        .collect();

    Ok(Json(BallResponse {
        center: params.c,
        members,
    }))
}

pub async fn get_ball_contains(
    State(state): State<AppState>,
    Query(params): Query<BallContainsParams>,
) -> Result<Json<BallContainsResponse>, ErrorResponse> {
    let oracle = state.current_oracle();
    let contains = oracle
        .ball_contains(&params.c, &params.v)
        .map_err(ErrorResponse::from_oracle_error)?;

    Ok(Json(BallContainsResponse {
        center: params.c,
        vertex: params.v,
        contains,
    }))
}

pub async fn get_landmark_distance(
    State(state): State<AppState>,
    Query(params): Query<LandmarkDistanceParams>,
) -> Result<Json<LandmarkDistanceResponse>, ErrorResponse> {
    let oracle = state.current_oracle();
    let distance = oracle
        .landmark_distance(&params.landmark, &params.v)
        .map_err(ErrorResponse::from_oracle_error)?;

    Ok(Json(LandmarkDistanceResponse {
        landmark: params.landmark,
        vertex: params.v,
        distance,
    }))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let oracle = state.current_oracle();
    Json(StatsResponse {
        oracle: oracle.stats(),
        cache: state.cache.stats(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn create_router(state: AppState, rate_limit_per_minute: u32) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let per_second = std::cmp::max(1, rate_limit_per_minute / 60);
    let burst_size = std::cmp::max(5, rate_limit_per_minute / 6);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(per_second as u64)
        .burst_size(burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .unwrap();

    info!(per_second, burst_size, "rate limiter configured");

    Router::new()
        .route("/health", get(health))
        .route("/stats", get(get_stats))
        .route("/distance", get(get_distance))
        .route("/distance/batch", post(batch_distance))
        .route("/landmarks", get(get_landmarks))
        .route("/ball", get(get_ball))
        .route("/ball/contains", get(get_ball_contains))
        .route("/landmark-distance", get(get_landmark_distance))
        .layer(ServiceBuilder::new().layer(cors))
        .layer(GovernorLayer {
            config: Arc::new(governor_conf),
        })
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16, rate_limit_per_minute: u32) -> anyhow::Result<()> {
    let router = create_router(state, rate_limit_per_minute);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
