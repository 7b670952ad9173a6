mod api;
mod cache;
mod config;
mod db;
mod error;
mod graph;
mod ingest;
mod oracle;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::http::AppState;
use cache::QueryCache;
use config::Config;
use db::Database;
use oracle::Oracle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("distance-oracle v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        "tokio runtime ready"
    );

    let config = Config::from_env();
    info!(
        graph_source = %config.graph_source,
        http_port = config.http_port,
        seed = config.seed,
        "configuration loaded"
    );

    let db = Database::open(&config.db_path).context("opening oracle database")?;

    let oracle = load_or_build_oracle(&config, &db)?;

    let stats = oracle.stats();
    info!(
        vertices = stats.graph.vertex_count,
        edges = stats.graph.edge_count,
        landmarks = stats.landmark_count,
        centers = stats.center_count,
        exact_entries = stats.exact_table_size,
        "oracle ready"
    );

    let config = Arc::new(config);
    let oracle = Arc::new(RwLock::new(Arc::new(oracle)));
    let cache = Arc::new(QueryCache::with_default_capacity());

    let app_state = AppState {
        oracle,
        config: config.clone(),
        cache,
    };

    let http_port = config.http_port;
    let rate_limit = config.rate_limit_per_minute;

    tokio::select! {
        result = api::http::start_server(app_state, http_port, rate_limit) => {
            if let Err(e) = result {
                error!("HTTP server error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    info!("shutting down");
    Ok(())
}

/// Restores the oracle from a persisted snapshot when `persist_snapshot`
/// is enabled and one exists, otherwise reads the configured edge-list
/// source and builds fresh. A fresh build is always persisted back (graph
/// and, if enabled, the oracle's tables) so the next restart can skip the
/// landmark/ball/exact-table BFS phases.
fn load_or_build_oracle(config: &Config, db: &Database) -> Result<Oracle> {
    if config.persist_snapshot {
        if let Some(snapshot) = db.load_snapshot().context("loading persisted oracle snapshot")? {
            info!("restoring oracle from persisted snapshot, skipping BFS phases");
            return Oracle::from_snapshot(
                snapshot.graph,
                snapshot.seed,
                snapshot.landmark_rows,
                snapshot.center_tokens,
                snapshot.exact_rows,
            )
            .context("rebuilding oracle from snapshot");
        }
    }

    let edges = ingest::read_edge_list(&config.graph_source)
        .with_context(|| format!("reading edge list from {}", config.graph_source))?;
    db.replace_edges(&edges).context("persisting graph to database")?;

    let oracle = Oracle::build(edges, config.seed, config.p1_override, config.p2_override)
        .context("building distance oracle")?;

    if config.persist_snapshot {
        db.save_snapshot(&oracle).context("persisting oracle snapshot")?;
    }

    Ok(oracle)
}
