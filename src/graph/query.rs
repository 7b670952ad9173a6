use super::exact::ExactDistanceTable;
use super::landmark::LandmarkDistanceTable;

/// Which branch of the query engine produced a distance, surfaced so the
/// oracle facade can track hit rates without re-deriving the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryBranch {
    Reflexive,
    Exact,
    Approximate,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryResult {
    pub distance: u32,
    pub branch: QueryBranch,
}

/// Picks `argmin_{l in L} dL(l, v)`, breaking ties by smallest landmark
/// index. `landmarks()` is already sorted ascending, so scanning in order
/// and only replacing on a strict improvement gives exactly that tie-break.
fn nearest_landmark(landmark_table: &LandmarkDistanceTable, v: u32) -> u32 {
    let landmarks = landmark_table.landmarks();
    let mut best = landmarks[0];
    let mut best_dist = landmark_table.distance(best, v);
    for &l in &landmarks[1..] {
        let d = landmark_table.distance(l, v);
        if d < best_dist {
            best = l;
            best_dist = d;
        }
    }
    best
}

/// Answers a distance query between two already-resolved vertex indices.
///
/// `s == t` is answered directly. Otherwise the exact-distance table is
/// consulted first; a miss falls back to the approximate branch: each
/// endpoint is routed through its own nearest landmark (`ℓ_s`, `ℓ_t`,
/// chosen independently, ties broken by smallest landmark index), and the
/// answer is `dL(ℓ_s, s) + dL(ℓ_s, ℓ_t) + dL(ℓ_t, t)`. This is always an
/// upper bound on the true distance but not necessarily tight, and is not
/// the same as minimizing over a single shared landmark — `ℓ_s` and `ℓ_t`
/// may differ.
///
/// Panics if the landmark table is empty when the approximate branch is
/// reached — a built oracle always has a nonempty landmark set, so this
/// can only indicate a caller bypassing `Oracle::build`.
pub fn query(
    landmark_table: &LandmarkDistanceTable,
    exact: &ExactDistanceTable,
    s: u32,
    t: u32,
) -> QueryResult {
    if s == t {
        return QueryResult {
            distance: 0,
            branch: QueryBranch::Reflexive,
        };
    }

    if let Some(distance) = exact.get(s, t) {
        return QueryResult {
            distance,
            branch: QueryBranch::Exact,
        };
    }

    assert!(
        !landmark_table.landmarks().is_empty(),
        "structural error: approximate query issued against an oracle with no landmarks"
    );

    let l_s = nearest_landmark(landmark_table, s);
    let l_t = nearest_landmark(landmark_table, t);
    let distance = landmark_table.distance(l_s, s)
        + landmark_table.distance(l_s, l_t)
        + landmark_table.distance(l_t, t);

    QueryResult {
        distance,
        branch: QueryBranch::Approximate,
    }
}


#[cfg(test)]
mod proptests {
    use super::super::bfs::bfs;
    use super::super::exact::compute_exact_distances;
    use super::super::landmark::{compute_landmark_distances, sample_landmarks};
    use super::super::neighborhood::{compute_balls, sample_centers};
    use super::super::proptest_support::random_connected_edges;
    use super::super::store::GraphStore;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `query(s, t) >= d_G(s, t)` for every pair on a random connected
        /// graph, regardless of which branch answers it.
        #[test]
        fn query_never_underestimates_true_distance(seed in any::<u64>(), n in 2usize..40) {
            let graph = GraphStore::build(random_connected_edges(seed, n)).unwrap();
            let landmarks = sample_landmarks(&graph, seed, None).unwrap();
            let table = compute_landmark_distances(&graph, &landmarks);
            let centers = sample_centers(&graph, seed, None).unwrap();
            let balls = compute_balls(&graph, &table, &centers);
            let exact = compute_exact_distances(&graph, &balls);

            let vcount = graph.num_vertices() as u32;
            for s in 0..vcount {
                let truth = bfs(&graph, s);
                for t in 0..vcount {
                    let result = query(&table, &exact, s, t);
                    prop_assert!(result.distance >= truth[t as usize]);
                }
            }
        }

        /// `query(s, t) == query(t, s)` for every pair on a random
        /// connected graph.
        #[test]
        fn query_is_symmetric_on_random_graphs(seed in any::<u64>(), n in 2usize..40) {
            let graph = GraphStore::build(random_connected_edges(seed, n)).unwrap();
            let landmarks = sample_landmarks(&graph, seed, None).unwrap();
            let table = compute_landmark_distances(&graph, &landmarks);
            let centers = sample_centers(&graph, seed, None).unwrap();
            let balls = compute_balls(&graph, &table, &centers);
            let exact = compute_exact_distances(&graph, &balls);

            let vcount = graph.num_vertices() as u32;
            for s in 0..vcount {
                for t in 0..vcount {
                    let forward = query(&table, &exact, s, t);
                    let backward = query(&table, &exact, t, s);
                    prop_assert_eq!(forward.distance, backward.distance);
                }
            }
        }
    }
}
