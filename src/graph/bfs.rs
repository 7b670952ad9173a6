use super::store::GraphStore;

/// Runs a full single-source BFS, returning the distance from `source` to
/// every vertex in the graph.
///
/// Panics if any vertex is left unreached: the graph store guarantees
/// connectivity at construction time, so an unreached vertex here can only
/// mean a bug upstream, not a recoverable runtime condition.
pub fn bfs(graph: &GraphStore, source: u32) -> Vec<u32> {
    let n = graph.num_vertices();
    let mut dist = vec![u32::MAX; n];
    dist[source as usize] = 0;
    let mut frontier = vec![source];
    let mut next = Vec::new();
    let mut level = 0u32;

    while !frontier.is_empty() {
        level += 1;
        for &u in &frontier {
            for &v in graph.neighbors(u) {
                if dist[v as usize] == u32::MAX {
                    dist[v as usize] = level;
                    next.push(v);
                }
            }
        }
        frontier.clear();
        std::mem::swap(&mut frontier, &mut next);
    }

    for (v, &d) in dist.iter().enumerate() {
        assert!(
            d != u32::MAX,
            "structural error: vertex {v} unreachable from {source} on a graph \
             store that guarantees connectivity at construction"
        );
    }

    dist
}

/// Runs a BFS from `source`, pruning expansion once the frontier would
/// reach `radius` (exclusive), and returns the sorted list of vertices at
/// distance strictly less than `radius`.
///
/// This is the "may be pruned at depth r(c)" optimization in the ball
/// computation: once the frontier is at distance `radius`, nothing on it
/// or beyond it can qualify, so there is no reason to expand further.
///
/// `radius = None` means unbounded — used only when the landmark set is
/// empty, so no landmark distance bounds the ball — and behaves like a
/// full BFS collecting every visited vertex.
pub fn ball_bfs(graph: &GraphStore, source: u32, radius: Option<u32>) -> Vec<u32> {
    if radius == Some(0) {
        return Vec::new();
    }

    let n = graph.num_vertices();
    let mut dist = vec![u32::MAX; n];
    dist[source as usize] = 0;
    let mut frontier = vec![source];
    let mut next = Vec::new();
    let mut visited = vec![source];
    let mut level = 0u32;

    loop {
        if let Some(r) = radius {
            if level + 1 >= r {
                break; // next level would land at distance >= r
            }
        }
        if frontier.is_empty() {
            break;
        }
        level += 1;
        for &u in &frontier {
            for &v in graph.neighbors(u) {
                if dist[v as usize] == u32::MAX {
                    dist[v as usize] = level;
                    visited.push(v);
                    next.push(v);
                }
            }
        }
        frontier.clear();
        std::mem::swap(&mut frontier, &mut next);
    }

    let mut members: Vec<u32> = visited
        .into_iter()
        .filter(|&v| radius.map_or(true, |r| dist[v as usize] < r))
        .collect();
    members.sort_unstable();
    members
}
