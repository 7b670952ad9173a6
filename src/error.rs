use thiserror::Error;

/// Errors the oracle's `build` and `query` surfaces can return.
///
/// Structural impossibilities (a BFS distance missing on a connected
/// graph) are not represented here — per design, those abort with a
/// diagnostic panic rather than a recoverable `Result`.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("graph has more than one connected component")]
    DisconnectedGraph,

    #[error("landmark sampling produced an empty set after {attempts} attempts")]
    EmptyLandmarkSet { attempts: u32 },

    #[error("vertex {0:?} is not present in the graph")]
    UnknownVertex(String),

    #[error("{name} must be in (0, 1], got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("vertex {0:?} is not a sampled center")]
    NotACenter(String),

    #[error("vertex {0:?} is not a sampled landmark")]
    NotALandmark(String),
}
