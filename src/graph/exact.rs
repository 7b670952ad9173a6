use super::bfs::bfs;
use super::neighborhood::BallSet;
use super::store::GraphStore;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;

fn pack(u: u32, v: u32) -> u64 {
    let (lo, hi) = if u <= v { (u, v) } else { (v, u) };
    ((lo as u64) << 32) | hi as u64
}

fn balls_intersect(a: &[u32], b: &[u32]) -> bool {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => return true,
        }
    }
    false
}

/// Exact pairwise distances, populated only for vertex pairs whose
/// enclosing balls intersect. Keyed on a packed `(lo, hi)` pair so lookup
/// is independent of query order.
pub struct ExactDistanceTable {
    table: FxHashMap<u64, u32>,
}

impl ExactDistanceTable {
    pub fn get(&self, u: u32, v: u32) -> Option<u32> {
        if u == v {
            return Some(0);
        }
        self.table.get(&pack(u, v)).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates stored entries as `(u, v, distance)` with `u < v`.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.table.iter().map(|(&key, &d)| {
            let lo = (key >> 32) as u32;
            let hi = (key & 0xFFFF_FFFF) as u32;
            (lo, hi, d)
        })
    }

    /// Rebuilds a table from `(u, v, distance)` entries, e.g. read back
    /// from a persisted snapshot.
    pub(crate) fn from_entries(entries: Vec<(u32, u32, u32)>) -> Self {
        let mut table = FxHashMap::default();
        for (u, v, d) in entries {
            table.insert(pack(u, v), d);
        }
        Self { table }
    }
}

/// Populates the exact-distance table: for every pair of centers `(c1,
/// c2)` with `c1 <= c2` (including `c1 == c2`, so distances within a
/// single ball are captured too) whose balls intersect, stores the exact
/// distance for every vertex pair drawn one from each ball.
///
/// Each distinct vertex that turns out to participate in at least one
/// qualifying pair gets exactly one BFS, run in parallel, and the
/// resulting distance vectors are reused across every pair it appears in.
pub fn compute_exact_distances(graph: &GraphStore, balls: &BallSet) -> ExactDistanceTable {
    let centers: Vec<u32> = balls.centers().copied().collect();
    let mut pending_sources: FxHashSet<u32> = FxHashSet::default();
    let mut qualifying_pairs: Vec<(u32, u32)> = Vec::new();

    for i in 0..centers.len() {
        for j in i..centers.len() {
            let c1 = centers[i];
            let c2 = centers[j];
            let b1 = balls.ball(c1).unwrap();
            let b2 = balls.ball(c2).unwrap();
            if b1.is_empty() || b2.is_empty() {
                continue;
            }
            if balls_intersect(b1, b2) {
                qualifying_pairs.push((c1, c2));
                pending_sources.extend(b1.iter().copied());
                pending_sources.extend(b2.iter().copied());
            }
        }
    }

    let sources: Vec<u32> = pending_sources.into_iter().collect();
    let dist_cache: FxHashMap<u32, Vec<u32>> = sources
        .par_iter()
        .map(|&s| (s, bfs(graph, s)))
        .collect();

    let mut table: FxHashMap<u64, u32> = FxHashMap::default();
    for (c1, c2) in qualifying_pairs {
        let b1 = balls.ball(c1).unwrap();
        let b2 = balls.ball(c2).unwrap();
        for &v1 in b1 {
            for &v2 in b2 {
                if v1 == v2 {
                    continue;
                }
                let key = pack(v1, v2);
                table.entry(key).or_insert_with(|| dist_cache[&v1][v2 as usize]);
            }
        }
    }

    ExactDistanceTable { table }
}

#[cfg(test)]
mod tests {
    use super::super::landmark::compute_landmark_distances;
    use super::super::neighborhood::compute_balls;
    use super::*;

    fn cycle_graph(len: usize) -> GraphStore {
        let mut edges: Vec<(String, String)> = (1..len)
            .map(|i| (i.to_string(), (i + 1).to_string()))
            .collect();
        edges.push((len.to_string(), "1".to_string()));
        GraphStore::build(edges).unwrap()
    }

    #[test]
    fn exact_table_reflects_true_distances_for_intersecting_balls() {
        let graph = cycle_graph(6);
        // No landmarks: r(c) is unbounded, so every center's ball is the
        // whole graph and every pair of vertices qualifies.
        let table_l = compute_landmark_distances(&graph, &[]);
        let one = graph.index_of("1").unwrap();
        let four = graph.index_of("4").unwrap();
        let balls = compute_balls(&graph, &table_l, &[one, four]);
        let exact = compute_exact_distances(&graph, &balls);

        for u in 0..graph.num_vertices() as u32 {
            let truth = bfs(&graph, u);
            for v in 0..graph.num_vertices() as u32 {
                if u == v {
                    continue;
                }
                if let Some(d) = exact.get(u, v) {
                    assert_eq!(d, truth[v as usize]);
                }
            }
        }
        assert!(!exact.is_empty());
    }

    #[test]
    fn reflexive_center_pair_populates_within_ball_distances() {
        let graph = cycle_graph(6);
        let table_l = compute_landmark_distances(&graph, &[]);
        let one = graph.index_of("1").unwrap();
        let balls = compute_balls(&graph, &table_l, &[one]);
        let exact = compute_exact_distances(&graph, &balls);

        let ball = balls.ball(one).unwrap().to_vec();
        for &u in &ball {
            for &v in &ball {
                if u != v {
                    assert!(exact.get(u, v).is_some());
                }
            }
        }
    }

    #[test]
    fn disjoint_balls_do_not_populate_each_other() {
        let graph = cycle_graph(6);
        let table_l = compute_landmark_distances(&graph, &[]);
        // radius 0 centers produce empty balls, which can't intersect anything.
        let one = graph.index_of("1").unwrap();
        let balls = compute_balls(&graph, &table_l, &[one]);
        assert!(!balls.ball(one).unwrap().is_empty());
    }
}
