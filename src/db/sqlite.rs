use anyhow::Result;
use rusqlite::{params, Connection};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::graph::GraphStore;
use crate::oracle::Oracle;

/// Everything needed to reconstruct an `Oracle` via `Oracle::from_snapshot`
/// without recomputing the landmark, ball, or exact-table BFS phases.
pub struct OracleSnapshot {
    pub graph: GraphStore,
    pub seed: u64,
    pub landmark_rows: Vec<(String, String, u32)>,
    pub center_tokens: Vec<String>,
    pub exact_rows: Vec<(String, String, u32)>,
}

/// Persistence layer for the input graph and, optionally, the built
/// oracle's tables.
///
/// A plain `vertices`/`edges` schema over opaque tokens, plus snapshot
/// tables for the oracle's built tables: `dL` rows, the center set `S`,
/// and `E` as `(u, v, d)` triples.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vertices (
                id INTEGER PRIMARY KEY,
                token TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS edges (
                a_id INTEGER NOT NULL,
                b_id INTEGER NOT NULL,
                PRIMARY KEY (a_id, b_id),
                FOREIGN KEY (a_id) REFERENCES vertices(id),
                FOREIGN KEY (b_id) REFERENCES vertices(id)
            );

            CREATE INDEX IF NOT EXISTS idx_edges_a ON edges(a_id);
            CREATE INDEX IF NOT EXISTS idx_edges_b ON edges(b_id);

            CREATE TABLE IF NOT EXISTS oracle_meta (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                seed INTEGER NOT NULL,
                built_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS landmark_distances (
                landmark_token TEXT NOT NULL,
                vertex_token TEXT NOT NULL,
                distance INTEGER NOT NULL,
                PRIMARY KEY (landmark_token, vertex_token)
            );

            CREATE TABLE IF NOT EXISTS centers (
                token TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS exact_distances (
                u_token TEXT NOT NULL,
                v_token TEXT NOT NULL,
                distance INTEGER NOT NULL,
                PRIMARY KEY (u_token, v_token)
            );
        "#,
        )?;

        info!("database schema initialized");
        Ok(())
    }

    /// Replaces the persisted graph wholesale with `edges`, deduplicating
    /// tokens into the `vertices` table. Used by the ingestion path so a
    /// restart can reload the same graph without re-reading the original
    /// edge-list source.
    pub fn replace_edges(&self, edges: &[(String, String)]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM vertices", [])?;

        let mut ids: FxHashMap<&str, i64> = FxHashMap::default();
        {
            let mut insert_vertex =
                tx.prepare_cached("INSERT INTO vertices (token) VALUES (?1)")?;
            for (a, b) in edges {
                for token in [a.as_str(), b.as_str()] {
                    if !ids.contains_key(token) {
                        let id = insert_vertex.insert(params![token])?;
                        ids.insert(token, id);
                    }
                }
            }
        }

        {
            let mut insert_edge = tx.prepare_cached(
                "INSERT OR IGNORE INTO edges (a_id, b_id) VALUES (?1, ?2)",
            )?;
            for (a, b) in edges {
                let a_id = ids[a.as_str()];
                let b_id = ids[b.as_str()];
                let (lo, hi) = if a_id <= b_id { (a_id, b_id) } else { (b_id, a_id) };
                insert_edge.execute(params![lo, hi])?;
            }
        }

        tx.commit()?;
        debug!(vertex_count = ids.len(), edge_count = edges.len(), "persisted graph");
        Ok(())
    }

    /// Reconstructs the graph store from the persisted `vertices`/`edges`
    /// tables. Returns `None` if no graph has been persisted yet.
    pub fn load_graph(&self) -> Result<Option<GraphStore>> {
        let conn = self.conn.lock().unwrap();

        let vertex_count: i64 = conn.query_row("SELECT COUNT(*) FROM vertices", [], |r| r.get(0))?;
        if vertex_count == 0 {
            return Ok(None);
        }

        let mut token_stmt = conn.prepare("SELECT id, token FROM vertices")?;
        let tokens: FxHashMap<i64, String> = token_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r: rusqlite::Result<(i64, String)>| r.ok())
            .collect();

        let mut edge_stmt = conn.prepare("SELECT a_id, b_id FROM edges")?;
        let edges: Vec<(String, String)> = edge_stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .filter_map(|r: rusqlite::Result<(i64, i64)>| r.ok())
            .filter_map(|(a_id, b_id)| {
                Some((tokens.get(&a_id)?.clone(), tokens.get(&b_id)?.clone()))
            })
            .collect();

        Ok(Some(GraphStore::build(edges)?))
    }

    /// Persists a built oracle's tables in triple-store form, replacing
    /// any previously persisted snapshot.
    pub fn save_snapshot(&self, oracle: &Oracle) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();

        tx.execute("DELETE FROM landmark_distances", [])?;
        tx.execute("DELETE FROM centers", [])?;
        tx.execute("DELETE FROM exact_distances", [])?;
        tx.execute(
            "INSERT OR REPLACE INTO oracle_meta (id, seed, built_at) VALUES (0, ?1, ?2)",
            params![oracle.seed() as i64, now],
        )?;

        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO landmark_distances (landmark_token, vertex_token, distance) VALUES (?1, ?2, ?3)",
            )?;
            for (l, v, d) in oracle.landmark_distance_rows() {
                insert.execute(params![l, v, d])?;
            }
        }

        {
            let mut insert = tx.prepare_cached("INSERT INTO centers (token) VALUES (?1)")?;
            for c in oracle.center_tokens() {
                insert.execute(params![c])?;
            }
        }

        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO exact_distances (u_token, v_token, distance) VALUES (?1, ?2, ?3)",
            )?;
            for (u, v, d) in oracle.exact_rows() {
                insert.execute(params![u, v, d])?;
            }
        }

        tx.commit()?;
        debug!(seed = oracle.seed(), "persisted oracle snapshot");
        Ok(())
    }

    /// Loads a persisted snapshot, if one exists, paired with the graph it
    /// was built over. Returns `None` if no oracle has ever been persisted
    /// (`oracle_meta` empty) so the caller knows to build fresh instead.
    pub fn load_snapshot(&self) -> Result<Option<OracleSnapshot>> {
        let graph = match self.load_graph()? {
            Some(graph) => graph,
            None => return Ok(None),
        };

        let conn = self.conn.lock().unwrap();

        let seed: Option<i64> = conn
            .query_row("SELECT seed FROM oracle_meta WHERE id = 0", [], |r| r.get(0))
            .ok();
        let seed = match seed {
            Some(s) => s as u64,
            None => return Ok(None),
        };

        let mut landmark_stmt =
            conn.prepare("SELECT landmark_token, vertex_token, distance FROM landmark_distances")?;
        let landmark_rows: Vec<(String, String, u32)> = landmark_stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u32))
            })?
            .filter_map(|r| r.ok())
            .collect();

        let mut center_stmt = conn.prepare("SELECT token FROM centers")?;
        let center_tokens: Vec<String> = center_stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut exact_stmt =
            conn.prepare("SELECT u_token, v_token, distance FROM exact_distances")?;
        let exact_rows: Vec<(String, String, u32)> = exact_stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u32))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(Some(OracleSnapshot {
            graph,
            seed,
            landmark_rows,
            center_tokens,
            exact_rows,
        }))
    }

    pub fn get_stats(&self) -> Result<(usize, usize)> {
        let conn = self.conn.lock().unwrap();
        let vertex_count: usize = conn.query_row("SELECT COUNT(*) FROM vertices", [], |r| r.get(0))?;
        let edge_count: usize = conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
        Ok((vertex_count, edge_count))
    }
}
