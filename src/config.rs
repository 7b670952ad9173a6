use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the edge-list file (or SQLite database, if `db_path` is
    /// set instead) used to build the oracle at startup.
    pub graph_source: String,
    pub http_port: u16,
    pub db_path: String,
    pub seed: u64,
    pub p1_override: Option<f64>,
    pub p2_override: Option<f64>,
    pub rate_limit_per_minute: u32,
    /// Whether to persist the built oracle's tables to `db_path` so a
    /// restart can skip recomputation.
    pub persist_snapshot: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let graph_source = env::var("GRAPH_SOURCE").unwrap_or_else(|_| "graph.tsv".into());

        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let db_path = env::var("DB_PATH").unwrap_or_else(|_| "oracle.db".into());

        let seed = env::var("SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(42);

        let p1_override = env::var("P1_OVERRIDE").ok().and_then(|p| p.parse().ok());
        let p2_override = env::var("P2_OVERRIDE").ok().and_then(|p| p.parse().ok());

        let rate_limit_per_minute = env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|r| r.parse().ok())
            .unwrap_or(100);

        let persist_snapshot = env::var("PERSIST_SNAPSHOT")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            graph_source,
            http_port,
            db_path,
            seed,
            p1_override,
            p2_override,
            rate_limit_per_minute,
            persist_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_unset() {
        for var in [
            "GRAPH_SOURCE",
            "HTTP_PORT",
            "DB_PATH",
            "SEED",
            "P1_OVERRIDE",
            "P2_OVERRIDE",
            "RATE_LIMIT_PER_MINUTE",
            "PERSIST_SNAPSHOT",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.seed, 42);
        assert_eq!(config.p1_override, None);
        assert!(!config.persist_snapshot);
    }
}
