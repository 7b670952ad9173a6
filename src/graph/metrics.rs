use super::query::QueryBranch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for the oracle's build phases and query-path branch hits.
///
/// The graph store is immutable once built, so unlike the lock-contention
/// metrics this is generalized from, there is no contention to measure —
/// only how long each build stage took and which branch `query` took.
pub struct OracleMetrics {
    landmark_phase_ns: AtomicU64,
    ball_phase_ns: AtomicU64,
    exact_phase_ns: AtomicU64,

    reflexive_query_count: AtomicU64,
    exact_query_count: AtomicU64,
    approximate_query_count: AtomicU64,
}

impl OracleMetrics {
    pub const fn new() -> Self {
        Self {
            landmark_phase_ns: AtomicU64::new(0),
            ball_phase_ns: AtomicU64::new(0),
            exact_phase_ns: AtomicU64::new(0),
            reflexive_query_count: AtomicU64::new(0),
            exact_query_count: AtomicU64::new(0),
            approximate_query_count: AtomicU64::new(0),
        }
    }

    fn record_stage(&self, stage: BuildStage, duration: Duration) {
        let ns = duration.as_nanos() as u64;
        let counter = match stage {
            BuildStage::Landmark => &self.landmark_phase_ns,
            BuildStage::Ball => &self.ball_phase_ns,
            BuildStage::Exact => &self.exact_phase_ns,
        };
        counter.fetch_add(ns, Ordering::Relaxed);
    }

    pub fn record_query(&self, branch: QueryBranch) {
        let counter = match branch {
            QueryBranch::Reflexive => &self.reflexive_query_count,
            QueryBranch::Exact => &self.exact_query_count,
            QueryBranch::Approximate => &self.approximate_query_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OracleMetricsSnapshot {
        OracleMetricsSnapshot {
            landmark_phase_us: self.landmark_phase_ns.load(Ordering::Relaxed) / 1000,
            ball_phase_us: self.ball_phase_ns.load(Ordering::Relaxed) / 1000,
            exact_phase_us: self.exact_phase_ns.load(Ordering::Relaxed) / 1000,
            reflexive_query_count: self.reflexive_query_count.load(Ordering::Relaxed),
            exact_query_count: self.exact_query_count.load(Ordering::Relaxed),
            approximate_query_count: self.approximate_query_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for OracleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OracleMetricsSnapshot {
    pub landmark_phase_us: u64,
    pub ball_phase_us: u64,
    pub exact_phase_us: u64,
    pub reflexive_query_count: u64,
    pub exact_query_count: u64,
    pub approximate_query_count: u64,
}

#[derive(Clone, Copy)]
enum BuildStage {
    Landmark,
    Ball,
    Exact,
}

/// RAII guard timing a single build stage.
pub struct StageTimer<'a> {
    metrics: &'a OracleMetrics,
    start: Instant,
    stage: BuildStage,
}

impl<'a> StageTimer<'a> {
    pub fn landmark(metrics: &'a OracleMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
            stage: BuildStage::Landmark,
        }
    }

    pub fn ball(metrics: &'a OracleMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
            stage: BuildStage::Ball,
        }
    }

    pub fn exact(metrics: &'a OracleMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
            stage: BuildStage::Exact,
        }
    }
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_stage(self.stage, self.start.elapsed());
    }
}
