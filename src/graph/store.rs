use super::interner::TokenInterner;
use crate::error::OracleError;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
}

/// Immutable adjacency representation of the input graph.
///
/// Built once from a finite edge stream; vertex tokens are interned and
/// mapped to dense `u32` indices used throughout the rest of the oracle.
/// Neighbor lists are sorted and deduplicated, enabling binary-search
/// membership checks.
pub struct GraphStore {
    #[allow(dead_code)] // kept alive so interned Arc<str> allocations stay valid
    interner: TokenInterner,
    token_to_id: FxHashMap<Arc<str>, u32>,
    id_to_token: Vec<Arc<str>>,
    adjacency: Vec<Vec<u32>>,
    edge_count: usize,
}

impl GraphStore {
    /// Builds a graph store from a finite stream of undirected edges.
    ///
    /// Self-loops and duplicate edges are silently deduplicated. Fails
    /// with `DisconnectedGraph` if the edges do not span a single
    /// connected component over all mentioned vertices.
    pub fn build<I>(edges: I) -> Result<Self, OracleError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let interner = TokenInterner::new();
        let mut token_to_id: FxHashMap<Arc<str>, u32> = FxHashMap::default();
        let mut id_to_token: Vec<Arc<str>> = Vec::new();
        let mut edge_set: FxHashSet<(u32, u32)> = FxHashSet::default();

        let mut intern_vertex = |token: &str,
                                  token_to_id: &mut FxHashMap<Arc<str>, u32>,
                                  id_to_token: &mut Vec<Arc<str>>|
         -> u32 {
            if let Some(&id) = token_to_id.get(token) {
                return id;
            }
            let interned = interner.intern(token);
            let id = id_to_token.len() as u32;
            id_to_token.push(interned.clone());
            token_to_id.insert(interned, id);
            id
        };

        for (a, b) in edges {
            let ua = intern_vertex(&a, &mut token_to_id, &mut id_to_token);
            let ub = intern_vertex(&b, &mut token_to_id, &mut id_to_token);
            if ua == ub {
                continue; // self-loop, dropped silently
            }
            let (lo, hi) = if ua < ub { (ua, ub) } else { (ub, ua) };
            edge_set.insert((lo, hi));
        }

        let n = id_to_token.len();
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); n];
        for &(u, v) in &edge_set {
            adjacency[u as usize].push(v);
            adjacency[v as usize].push(u);
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }

        let store = Self {
            interner,
            token_to_id,
            id_to_token,
            adjacency,
            edge_count: edge_set.len(),
        };

        store.check_connected()?;
        Ok(store)
    }

    fn check_connected(&self) -> Result<(), OracleError> {
        let n = self.id_to_token.len();
        if n <= 1 {
            return Ok(());
        }

        let mut parent: Vec<u32> = (0..n as u32).collect();

        fn find(parent: &mut [u32], x: u32) -> u32 {
            let mut root = x;
            while parent[root as usize] != root {
                root = parent[root as usize];
            }
            let mut cur = x;
            while parent[cur as usize] != root {
                let next = parent[cur as usize];
                parent[cur as usize] = root;
                cur = next;
            }
            root
        }

        for (u, neighbors) in self.adjacency.iter().enumerate() {
            for &v in neighbors {
                let ru = find(&mut parent, u as u32);
                let rv = find(&mut parent, v);
                if ru != rv {
                    parent[ru as usize] = rv;
                }
            }
        }

        let root0 = find(&mut parent, 0);
        let disconnected = (1..n as u32).any(|v| find(&mut parent, v) != root0);
        if disconnected {
            Err(OracleError::DisconnectedGraph)
        } else {
            Ok(())
        }
    }

    pub fn neighbors(&self, v: u32) -> &[u32] {
        &self.adjacency[v as usize]
    }

    pub fn num_vertices(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token_of(&self, v: u32) -> Option<&Arc<str>> {
        self.id_to_token.get(v as usize)
    }

    pub fn token_arc(&self, v: u32) -> Option<Arc<str>> {
        self.id_to_token.get(v as usize).cloned()
    }

    pub fn is_direct_edge(&self, a: u32, b: u32) -> bool {
        self.adjacency
            .get(a as usize)
            .map(|list| list.binary_search(&b).is_ok())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            vertex_count: self.num_vertices(),
            edge_count: self.edge_count,
        }
    }
}
