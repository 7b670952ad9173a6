use super::bfs::bfs;
use super::store::GraphStore;
use crate::error::OracleError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Bounded number of resample attempts before giving up on a nonempty
/// landmark set. Each attempt perturbs the seed rather than retrying with
/// the same one, so the sequence of attempts is itself deterministic.
const MAX_SAMPLE_ATTEMPTS: u32 = 20;

/// Samples the landmark set `L` by including each vertex independently
/// with probability `p1` (default `n^(-1/3)`), using a seeded RNG so the
/// same seed always reproduces the same set.
///
/// Retries with a perturbed seed up to `MAX_SAMPLE_ATTEMPTS` times if
/// sampling produces an empty set, then fails with `EmptyLandmarkSet`.
pub fn sample_landmarks(
    graph: &GraphStore,
    seed: u64,
    p1_override: Option<f64>,
) -> Result<Vec<u32>, OracleError> {
    let n = graph.num_vertices();
    if n == 0 {
        return Ok(Vec::new());
    }

    let p1 = match p1_override {
        Some(p) => {
            if !(p > 0.0 && p <= 1.0) {
                return Err(OracleError::InvalidParameter { name: "p1", value: p });
            }
            p
        }
        None => (n as f64).powf(-1.0 / 3.0),
    };

    for attempt in 0..MAX_SAMPLE_ATTEMPTS {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(attempt as u64));
        let mut landmarks: Vec<u32> = (0..n as u32).filter(|_| rng.gen::<f64>() < p1).collect();
        if !landmarks.is_empty() {
            landmarks.sort_unstable();
            return Ok(landmarks);
        }
    }

    Err(OracleError::EmptyLandmarkSet {
        attempts: MAX_SAMPLE_ATTEMPTS,
    })
}

/// Dense `|L| x n` table of distances from every landmark to every vertex.
pub struct LandmarkDistanceTable {
    landmarks: Vec<u32>,
    position: FxHashMap<u32, usize>,
    n: usize,
    data: Vec<u32>,
}

impl LandmarkDistanceTable {
    pub fn landmarks(&self) -> &[u32] {
        &self.landmarks
    }

    /// Distance from `landmark` to `v`. Panics if `landmark` is not a
    /// sampled landmark — callers are expected to iterate `landmarks()`.
    pub fn distance(&self, landmark: u32, v: u32) -> u32 {
        let row = self.position[&landmark];
        self.data[row * self.n + v as usize]
    }

    /// Like [`distance`](Self::distance), but returns `None` instead of
    /// panicking when `landmark` was never sampled into `L`. Used by the
    /// oracle's `landmark_distance` diagnostic lookup, which takes an
    /// arbitrary caller-supplied token and must distinguish "not a
    /// landmark" from a normal (possibly zero) distance.
    pub fn try_distance(&self, landmark: u32, v: u32) -> Option<u32> {
        self.position
            .get(&landmark)
            .map(|&row| self.data[row * self.n + v as usize])
    }

    /// Rebuilds a table from `(landmark, vertex, distance)` rows, e.g. read
    /// back from a persisted snapshot. Rows may arrive in any order.
    pub(crate) fn from_rows(n: usize, rows: Vec<(u32, u32, u32)>) -> Self {
        let mut landmarks: Vec<u32> = rows.iter().map(|&(l, _, _)| l).collect();
        landmarks.sort_unstable();
        landmarks.dedup();
        let position: FxHashMap<u32, usize> = landmarks
            .iter()
            .enumerate()
            .map(|(i, &l)| (l, i))
            .collect();

        let mut data = vec![0u32; landmarks.len() * n];
        for (l, v, d) in rows {
            let row = position[&l];
            data[row * n + v as usize] = d;
        }

        Self {
            landmarks,
            position,
            n,
            data,
        }
    }
}

/// Computes the landmark distance table by running one BFS per landmark,
/// in parallel, and reducing the results into a single dense matrix.
pub fn compute_landmark_distances(graph: &GraphStore, landmarks: &[u32]) -> LandmarkDistanceTable {
    let n = graph.num_vertices();
    let mut landmarks = landmarks.to_vec();
    landmarks.sort_unstable();
    landmarks.dedup();

    let rows: Vec<Vec<u32>> = landmarks.par_iter().map(|&l| bfs(graph, l)).collect();

    let mut data = vec![0u32; landmarks.len() * n];
    for (row_idx, row) in rows.into_iter().enumerate() {
        data[row_idx * n..(row_idx + 1) * n].copy_from_slice(&row);
    }

    let position = landmarks
        .iter()
        .enumerate()
        .map(|(i, &l)| (l, i))
        .collect();

    LandmarkDistanceTable {
        landmarks,
        position,
        n,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(len: usize) -> GraphStore {
        let edges: Vec<(String, String)> = (1..len)
            .map(|i| (i.to_string(), (i + 1).to_string()))
            .collect();
        GraphStore::build(edges).unwrap()
    }

    #[test]
    fn sampling_is_deterministic_for_a_fixed_seed() {
        let graph = path_graph(30);
        let a = sample_landmarks(&graph, 42, None).unwrap();
        let b = sample_landmarks(&graph, 42, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_can_produce_different_sets() {
        let graph = path_graph(30);
        let a = sample_landmarks(&graph, 1, None).unwrap();
        let b = sample_landmarks(&graph, 2, None).unwrap();
        // Not a hard guarantee in general, but overwhelmingly true at this size.
        assert!(a != b || a.len() == graph.num_vertices());
    }

    #[test]
    fn p1_override_out_of_range_is_rejected() {
        let graph = path_graph(10);
        assert!(matches!(
            sample_landmarks(&graph, 1, Some(0.0)),
            Err(OracleError::InvalidParameter { name: "p1", .. })
        ));
        assert!(matches!(
            sample_landmarks(&graph, 1, Some(1.5)),
            Err(OracleError::InvalidParameter { name: "p1", .. })
        ));
    }

    #[test]
    fn p1_override_of_one_selects_every_vertex() {
        let graph = path_graph(10);
        let landmarks = sample_landmarks(&graph, 7, Some(1.0)).unwrap();
        assert_eq!(landmarks.len(), graph.num_vertices());
    }

    #[test]
    fn empty_graph_has_no_landmarks() {
        let graph = GraphStore::build(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(sample_landmarks(&graph, 1, None).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn landmark_distance_table_matches_bfs() {
        let graph = path_graph(6);
        let one = graph.index_of("1").unwrap();
        let table = compute_landmark_distances(&graph, &[one]);
        let direct = bfs(&graph, one);
        for v in 0..graph.num_vertices() as u32 {
            assert_eq!(table.distance(one, v), direct[v as usize]);
        }
    }
}
