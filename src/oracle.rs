use crate::error::OracleError;
use crate::graph::metrics::StageTimer;
use crate::graph::{
    exact, landmark, neighborhood, query, BallSet, ExactDistanceTable, GraphStats,
    GraphStore, LandmarkDistanceTable, OracleMetrics,
};
use tracing::{debug, info};

/// The two-level landmark-and-ball approximate distance oracle.
///
/// Built once from an edge stream; afterwards every table is immutable
/// and `query` is synchronous, lock-free and reentrant.
pub struct Oracle {
    graph: GraphStore,
    seed: u64,
    landmark_table: LandmarkDistanceTable,
    balls: BallSet,
    exact: ExactDistanceTable,
    metrics: OracleMetrics,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OracleStats {
    pub graph: GraphStats,
    pub landmark_count: usize,
    pub center_count: usize,
    pub exact_table_size: usize,
    pub metrics: crate::graph::metrics::OracleMetricsSnapshot,
}

impl Oracle {
    /// Builds an oracle from a finite stream of undirected edges.
    ///
    /// `seed` drives both the landmark and center sampling; `p1_override`
    /// and `p2_override` replace the default `n^(-1/3)` / `n^(-2/3)`
    /// sampling probabilities when set. The build pipeline runs in the
    /// fixed order the oracle's correctness depends on: graph store, then
    /// landmarks and their distance table, then centers and their balls,
    /// then the exact-distance table.
    pub fn build<I>(
        edges: I,
        seed: u64,
        p1_override: Option<f64>,
        p2_override: Option<f64>,
    ) -> Result<Self, OracleError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let graph = GraphStore::build(edges)?;
        let stats = graph.stats();
        info!(
            vertices = stats.vertex_count,
            edges = stats.edge_count,
            "graph store built"
        );

        let metrics = OracleMetrics::new();

        let landmark_table = {
            let _timer = StageTimer::landmark(&metrics);
            let landmarks = landmark::sample_landmarks(&graph, seed, p1_override)?;
            info!(landmark_count = landmarks.len(), "landmarks sampled");
            landmark::compute_landmark_distances(&graph, &landmarks)
        };

        let balls = {
            let _timer = StageTimer::ball(&metrics);
            let centers = neighborhood::sample_centers(&graph, seed, p2_override)?;
            info!(center_count = centers.len(), "centers sampled");
            neighborhood::compute_balls(&graph, &landmark_table, &centers)
        };

        let exact = {
            let _timer = StageTimer::exact(&metrics);
            let table = exact::compute_exact_distances(&graph, &balls);
            info!(exact_table_size = table.len(), "exact-distance table built");
            table
        };

        Ok(Self {
            graph,
            seed,
            landmark_table,
            balls,
            exact,
            metrics,
        })
    }

    /// Reconstructs an oracle from a persisted snapshot (landmark distance
    /// rows and exact-distance rows keyed by token) plus the already-loaded
    /// graph and center token set, skipping the landmark-BFS and
    /// exact-table-build phases. Balls are still recomputed from the
    /// restored landmark table, since they are cheap relative to the BFS
    /// phases a snapshot exists to avoid.
    pub fn from_snapshot(
        graph: GraphStore,
        seed: u64,
        landmark_rows: impl IntoIterator<Item = (String, String, u32)>,
        center_tokens: impl IntoIterator<Item = String>,
        exact_rows: impl IntoIterator<Item = (String, String, u32)>,
    ) -> Result<Self, OracleError> {
        let n = graph.num_vertices();

        let mut rows = Vec::new();
        for (l_tok, v_tok, d) in landmark_rows {
            let l = graph
                .index_of(&l_tok)
                .ok_or_else(|| OracleError::UnknownVertex(l_tok.clone()))?;
            let v = graph
                .index_of(&v_tok)
                .ok_or_else(|| OracleError::UnknownVertex(v_tok.clone()))?;
            rows.push((l, v, d));
        }
        let landmark_table = LandmarkDistanceTable::from_rows(n, rows);

        let mut center_indices = Vec::new();
        for token in center_tokens {
            let idx = graph
                .index_of(&token)
                .ok_or_else(|| OracleError::UnknownVertex(token.clone()))?;
            center_indices.push(idx);
        }
        center_indices.sort_unstable();
        let balls = neighborhood::compute_balls(&graph, &landmark_table, &center_indices);

        let mut entries = Vec::new();
        for (u_tok, v_tok, d) in exact_rows {
            let u = graph
                .index_of(&u_tok)
                .ok_or_else(|| OracleError::UnknownVertex(u_tok.clone()))?;
            let v = graph
                .index_of(&v_tok)
                .ok_or_else(|| OracleError::UnknownVertex(v_tok.clone()))?;
            entries.push((u, v, d));
        }
        let exact = ExactDistanceTable::from_entries(entries);

        Ok(Self {
            graph,
            seed,
            landmark_table,
            balls,
            exact,
            metrics: OracleMetrics::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Dense index of a vertex token, for callers that want a compact key
    /// (e.g. an HTTP-layer query cache) instead of repeatedly hashing the
    /// token string itself.
    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.graph.index_of(token)
    }

    /// Rows of the landmark distance table as `(landmark, vertex,
    /// distance)` token triples, for persisting a snapshot.
    pub fn landmark_distance_rows(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        let graph = &self.graph;
        let table = &self.landmark_table;
        table.landmarks().iter().flat_map(move |&l| {
            let l_token = graph.token_of(l).expect("landmark index valid").as_ref();
            (0..graph.num_vertices() as u32).map(move |v| {
                let v_token = graph.token_of(v).expect("vertex index valid").as_ref();
                (l_token, v_token, table.distance(l, v))
            })
        })
    }

    /// Tokens of the sampled center set `S`, for persisting a snapshot.
    pub fn center_tokens(&self) -> impl Iterator<Item = &str> + '_ {
        let graph = &self.graph;
        self.balls
            .centers()
            .map(move |&c| graph.token_of(c).expect("center index valid").as_ref())
    }

    /// Rows of the exact-distance table as `(u, v, distance)` token
    /// triples, for persisting a snapshot.
    pub fn exact_rows(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        let graph = &self.graph;
        self.exact.entries().map(move |(u, v, d)| {
            (
                graph.token_of(u).expect("exact u valid").as_ref(),
                graph.token_of(v).expect("exact v valid").as_ref(),
                d,
            )
        })
    }

    /// Answers the shortest-path distance between two vertex tokens.
    pub fn query(&self, s: &str, t: &str) -> Result<u32, OracleError> {
        let s_idx = self
            .graph
            .index_of(s)
            .ok_or_else(|| OracleError::UnknownVertex(s.to_string()))?;
        let t_idx = self
            .graph
            .index_of(t)
            .ok_or_else(|| OracleError::UnknownVertex(t.to_string()))?;

        let result = query::query(&self.landmark_table, &self.exact, s_idx, t_idx);
        self.metrics.record_query(result.branch);
        debug!(s, t, distance = result.distance, branch = ?result.branch, "query answered");
        Ok(result.distance)
    }

    /// Tokens of the sampled landmark set `L`, in index order.
    pub fn landmarks(&self) -> impl Iterator<Item = &str> {
        self.landmark_table
            .landmarks()
            .iter()
            .map(|&v| self.graph.token_of(v).expect("landmark index out of range").as_ref())
    }

    /// Tokens of the ball `B(c)` for the center token `c`.
    pub fn ball(&self, c: &str) -> Result<impl Iterator<Item = &str>, OracleError> {
        let idx = self
            .graph
            .index_of(c)
            .ok_or_else(|| OracleError::UnknownVertex(c.to_string()))?;
        let members = self
            .balls
            .ball(idx)
            .ok_or_else(|| OracleError::NotACenter(c.to_string()))?;
        Ok(members
            .iter()
            .map(move |&v| self.graph.token_of(v).expect("ball member out of range").as_ref()))
    }

    /// Diagnostic check for whether `v` lies in the ball `B(c)`, without
    /// materializing the whole ball: a binary-search membership test
    /// against the one center's sorted member list.
    pub fn ball_contains(&self, c: &str, v: &str) -> Result<bool, OracleError> {
        let c_idx = self
            .graph
            .index_of(c)
            .ok_or_else(|| OracleError::UnknownVertex(c.to_string()))?;
        let v_idx = self
            .graph
            .index_of(v)
            .ok_or_else(|| OracleError::UnknownVertex(v.to_string()))?;
        if self.balls.ball(c_idx).is_none() {
            return Err(OracleError::NotACenter(c.to_string()));
        }
        Ok(self.balls.contains(c_idx, v_idx))
    }

    /// Diagnostic distance from a sampled landmark `landmark` to vertex
    /// `v`, i.e. a single row of `dL` addressed by token. Returns
    /// `NotALandmark` if `landmark` was not selected into `L` at build
    /// time — `L` is fixed after `build`, so this can only ever be a
    /// caller error, not a transient condition.
    pub fn landmark_distance(&self, landmark: &str, v: &str) -> Result<u32, OracleError> {
        let l_idx = self
            .graph
            .index_of(landmark)
            .ok_or_else(|| OracleError::UnknownVertex(landmark.to_string()))?;
        let v_idx = self
            .graph
            .index_of(v)
            .ok_or_else(|| OracleError::UnknownVertex(v.to_string()))?;
        self.landmark_table
            .try_distance(l_idx, v_idx)
            .ok_or_else(|| OracleError::NotALandmark(landmark.to_string()))
    }

    pub fn stats(&self) -> OracleStats {
        OracleStats {
            graph: self.graph.stats(),
            landmark_count: self.landmark_table.landmarks().len(),
            center_count: self.balls.len(),
            exact_table_size: self.exact.len(),
            metrics: self.metrics.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn builds_and_answers_reflexive_query() {
        let oracle = Oracle::build(
            edges(&[("a", "b"), ("b", "c"), ("c", "d")]),
            1,
            None,
            None,
        )
        .unwrap();
        assert_eq!(oracle.query("a", "a").unwrap(), 0);
    }

    #[test]
    fn query_matches_true_distance_on_small_graph() {
        let oracle = Oracle::build(
            edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]),
            7,
            Some(1.0),
            Some(1.0),
        )
        .unwrap();
        // With p1 = p2 = 1, every vertex is a landmark and a center, so
        // every pair is covered exactly.
        assert_eq!(oracle.query("a", "e").unwrap(), 4);
        assert_eq!(oracle.query("a", "c").unwrap(), 2);
    }

    #[test]
    fn unknown_vertex_is_rejected() {
        let oracle = Oracle::build(edges(&[("a", "b")]), 1, None, None).unwrap();
        assert!(matches!(
            oracle.query("a", "nope"),
            Err(OracleError::UnknownVertex(_))
        ));
    }

    #[test]
    fn ball_query_matches_direct_center_sampling() {
        use crate::graph::{neighborhood, GraphStore};

        let pairs = edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "f")]);
        let oracle = Oracle::build(pairs.clone(), 3, Some(0.5), Some(0.5)).unwrap();

        let graph = GraphStore::build(pairs).unwrap();
        let centers = neighborhood::sample_centers(&graph, 3, Some(0.5)).unwrap();

        for token in ["a", "b", "c", "d", "e", "f"] {
            let idx = graph.index_of(token).unwrap();
            let is_center = centers.contains(&idx);
            assert_eq!(oracle.ball(token).is_ok(), is_center);
        }
    }

    #[test]
    fn disconnected_graph_fails_build() {
        let err = Oracle::build(edges(&[("a", "b"), ("c", "d")]), 1, None, None).unwrap_err();
        assert!(matches!(err, OracleError::DisconnectedGraph));
    }

    #[test]
    fn snapshot_round_trip_preserves_query_results() {
        use crate::graph::GraphStore;

        let pairs = edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
        let oracle = Oracle::build(pairs.clone(), 11, Some(1.0), Some(1.0)).unwrap();

        let landmark_rows: Vec<(String, String, u32)> = oracle
            .landmark_distance_rows()
            .map(|(l, v, d)| (l.to_string(), v.to_string(), d))
            .collect();
        let centers: Vec<String> = oracle.center_tokens().map(|c| c.to_string()).collect();
        let exact_rows: Vec<(String, String, u32)> = oracle
            .exact_rows()
            .map(|(u, v, d)| (u.to_string(), v.to_string(), d))
            .collect();

        let graph = GraphStore::build(pairs).unwrap();
        let restored =
            Oracle::from_snapshot(graph, oracle.seed(), landmark_rows, centers, exact_rows)
                .unwrap();

        assert_eq!(restored.query("a", "e").unwrap(), oracle.query("a", "e").unwrap());
        assert_eq!(restored.query("b", "d").unwrap(), oracle.query("b", "d").unwrap());
    }

    #[test]
    fn stats_report_table_sizes() {
        let oracle = Oracle::build(
            edges(&[("a", "b"), ("b", "c"), ("c", "d")]),
            1,
            Some(1.0),
            Some(1.0),
        )
        .unwrap();
        let stats = oracle.stats();
        assert_eq!(stats.graph.vertex_count, 4);
        assert_eq!(stats.landmark_count, 4);
    }

    #[test]
    fn build_is_idempotent_for_same_inputs() {
        let pairs = edges(&[
            ("a", "b"),
            ("b", "c"),
            ("c", "d"),
            ("d", "e"),
            ("e", "f"),
            ("f", "a"),
        ]);
        let first = Oracle::build(pairs.clone(), 99, Some(0.5), Some(0.5)).unwrap();
        let second = Oracle::build(pairs, 99, Some(0.5), Some(0.5)).unwrap();

        let first_stats = first.stats();
        let second_stats = second.stats();
        assert_eq!(first_stats.landmark_count, second_stats.landmark_count);
        assert_eq!(first_stats.center_count, second_stats.center_count);
        assert_eq!(first_stats.exact_table_size, second_stats.exact_table_size);

        for s in ["a", "b", "c", "d", "e", "f"] {
            for t in ["a", "b", "c", "d", "e", "f"] {
                assert_eq!(
                    first.query(s, t).unwrap(),
                    second.query(s, t).unwrap(),
                    "query({s}, {t}) differs between two builds of the same inputs"
                );
            }
        }
    }

    #[test]
    fn landmark_distance_reports_not_a_landmark_for_non_landmark_tokens() {
        use crate::graph::{landmark, GraphStore};

        let pairs = edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "f")]);
        let oracle = Oracle::build(pairs.clone(), 3, Some(0.5), Some(0.5)).unwrap();

        let graph = GraphStore::build(pairs).unwrap();
        let landmark_ids = landmark::sample_landmarks(&graph, 3, Some(0.5)).unwrap();

        for token in ["a", "b", "c", "d", "e", "f"] {
            let idx = graph.index_of(token).unwrap();
            let is_landmark = landmark_ids.contains(&idx);
            let result = oracle.landmark_distance(token, "a");
            assert_eq!(
                result.is_ok(),
                is_landmark,
                "landmark_distance({token}, \"a\") ok-ness disagreed with direct sampling"
            );
            if !is_landmark {
                assert!(matches!(result, Err(OracleError::NotALandmark(_))));
            }
        }
    }

    #[test]
    fn ball_contains_matches_ball_membership() {
        let pairs = edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
        let oracle = Oracle::build(pairs, 3, Some(0.5), Some(0.5)).unwrap();

        for c in ["a", "b", "c", "d", "e"] {
            if let Ok(members) = oracle.ball(c) {
                let members: Vec<&str> = members.collect();
                for v in ["a", "b", "c", "d", "e"] {
                    assert_eq!(
                        oracle.ball_contains(c, v).unwrap(),
                        members.contains(&v),
                        "ball_contains({c}, {v}) disagreed with ball({c})"
                    );
                }
            } else {
                assert!(matches!(
                    oracle.ball_contains(c, "a"),
                    Err(OracleError::NotACenter(_))
                ));
            }
        }
    }
}
