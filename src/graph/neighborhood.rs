use super::bfs::ball_bfs;
use super::landmark::LandmarkDistanceTable;
use super::store::GraphStore;
use crate::error::OracleError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Offset applied to the build seed before sampling centers, so the center
/// set is decorrelated from the landmark set even when both are derived
/// from the same build seed.
const CENTER_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// Samples the center set `S` by including each vertex independently with
/// probability `p2` (default `n^(-2/3)`). Unlike landmark sampling, an
/// empty center set is a valid (if degenerate) outcome — it simply means
/// the exact-distance table will be empty and every query falls back to
/// the approximate branch.
pub fn sample_centers(
    graph: &GraphStore,
    seed: u64,
    p2_override: Option<f64>,
) -> Result<Vec<u32>, OracleError> {
    let n = graph.num_vertices();
    if n == 0 {
        return Ok(Vec::new());
    }

    let p2 = match p2_override {
        Some(p) => {
            if !(p > 0.0 && p <= 1.0) {
                return Err(OracleError::InvalidParameter { name: "p2", value: p });
            }
            p
        }
        None => (n as f64).powf(-2.0 / 3.0),
    };

    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(CENTER_SEED_OFFSET));
    let mut centers: Vec<u32> = (0..n as u32).filter(|_| rng.gen::<f64>() < p2).collect();
    centers.sort_unstable();
    Ok(centers)
}

/// Balls `B(c)` for every sampled center, keyed by center vertex index.
pub struct BallSet {
    balls: FxHashMap<u32, Vec<u32>>,
}

impl BallSet {
    pub fn ball(&self, center: u32) -> Option<&[u32]> {
        self.balls.get(&center).map(|v| v.as_slice())
    }

    pub fn contains(&self, center: u32, v: u32) -> bool {
        self.balls
            .get(&center)
            .map(|b| b.binary_search(&v).is_ok())
            .unwrap_or(false)
    }

    pub fn centers(&self) -> impl Iterator<Item = &u32> {
        self.balls.keys()
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }
}

/// Computes `B(c)` for every center: `r(c)` is the distance from `c` to
/// its nearest landmark, and `B(c) = { v : d_G(c, v) < r(c) }`. If the
/// landmark set is empty, `r(c)` is treated as infinite and `B(c)` is
/// every vertex reachable from `c` (the whole graph, since it is
/// connected).
pub fn compute_balls(
    graph: &GraphStore,
    landmark_table: &LandmarkDistanceTable,
    centers: &[u32],
) -> BallSet {
    let landmarks = landmark_table.landmarks();

    let results: Vec<(u32, Vec<u32>)> = centers
        .par_iter()
        .map(|&c| {
            let radius = if landmarks.is_empty() {
                None
            } else {
                landmarks
                    .iter()
                    .map(|&l| landmark_table.distance(l, c))
                    .min()
            };
            (c, ball_bfs(graph, c, radius))
        })
        .collect();

    BallSet {
        balls: results.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::landmark::compute_landmark_distances;
    use super::*;

    fn path_graph(len: usize) -> GraphStore {
        let edges: Vec<(String, String)> = (1..len)
            .map(|i| (i.to_string(), (i + 1).to_string()))
            .collect();
        GraphStore::build(edges).unwrap()
    }

    #[test]
    fn p2_override_out_of_range_is_rejected() {
        let graph = path_graph(10);
        assert!(matches!(
            sample_centers(&graph, 1, Some(0.0)),
            Err(OracleError::InvalidParameter { name: "p2", .. })
        ));
    }

    #[test]
    fn empty_graph_has_no_centers() {
        let graph = GraphStore::build(Vec::<(String, String)>::new()).unwrap();
        assert!(sample_centers(&graph, 1, None).unwrap().is_empty());
    }

    #[test]
    fn ball_membership_matches_radius_definition() {
        let graph = path_graph(20);
        let center = graph.index_of("10").unwrap();
        let landmark = graph.index_of("1").unwrap();
        let table = compute_landmark_distances(&graph, &[landmark]);
        let balls = compute_balls(&graph, &table, &[center]);

        let radius = table.distance(landmark, center);
        let ball = balls.ball(center).unwrap();
        for v in 0..graph.num_vertices() as u32 {
            let d = super::super::bfs::bfs(&graph, center)[v as usize];
            let should_contain = d < radius;
            assert_eq!(
                ball.binary_search(&v).is_ok(),
                should_contain,
                "vertex {v} membership mismatch at radius {radius}"
            );
        }
    }

    #[test]
    fn zero_radius_center_has_empty_ball() {
        // A center coinciding with its own landmark has r(c) = 0.
        let graph = path_graph(10);
        let landmark = graph.index_of("1").unwrap();
        let table = compute_landmark_distances(&graph, &[landmark]);
        let balls = compute_balls(&graph, &table, &[landmark]);
        assert!(balls.ball(landmark).unwrap().is_empty());
    }

    #[test]
    fn empty_landmark_set_gives_unbounded_balls() {
        let graph = path_graph(6);
        let table = compute_landmark_distances(&graph, &[]);
        let center = graph.index_of("3").unwrap();
        let balls = compute_balls(&graph, &table, &[center]);
        assert_eq!(balls.ball(center).unwrap().len(), graph.num_vertices());
    }
}
