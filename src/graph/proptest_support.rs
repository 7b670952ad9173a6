//! Shared random-connected-graph generator for the property tests in
//! `neighborhood.rs`, `query.rs`, and `oracle.rs`: a random spanning tree
//! guarantees connectivity, then a handful of extra random edges are added
//! on top so most generated graphs have cycles rather than being bare
//! trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds the edge list of a random connected graph over `n` vertices
/// (clamped to `[1, 40]`, matching the size bound in SPEC_FULL.md's
/// property-test commitment), labeled `"0"..`. Deterministic in `seed`.
pub fn random_connected_edges(seed: u64, n: usize) -> Vec<(String, String)> {
    let n = n.clamp(1, 40);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut order: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }

    let mut edges = Vec::new();
    for i in 1..n {
        let parent_pos = rng.gen_range(0..i);
        edges.push((order[i].to_string(), order[parent_pos].to_string()));
    }

    let extra_edges = n / 3;
    for _ in 0..extra_edges {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a != b {
            edges.push((a.to_string(), b.to_string()));
        }
    }

    edges
}
