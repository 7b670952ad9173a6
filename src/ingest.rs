use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Reads the build input for the oracle: a finite sequence of `(token,
/// token)` edges. This module does no domain-specific parsing — BioGRID
/// ingestion and any other source-specific loader only need to produce
/// this same edge-stream shape.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read edge list {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed edge list line {line_no} in {path:?}: expected \"token<TAB>token\", got {line:?}")]
    MalformedLine {
        path: String,
        line_no: usize,
        line: String,
    },
}

/// Reads a finite edge stream from a `token<TAB>token` per-line file.
///
/// Blank lines and lines starting with `#` are skipped (comments). Tokens
/// are taken verbatim, including surrounding content other than the
/// trailing newline; duplicate and self-loop edges are left for
/// `GraphStore::build` to deduplicate.
pub fn read_edge_list(path: impl AsRef<Path>) -> Result<Vec<(String, String)>, IngestError> {
    let path = path.as_ref();
    let path_string = path.display().to_string();
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path_string.clone(),
        source,
    })?;

    let mut edges = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| IngestError::Io {
            path: path_string.clone(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.splitn(2, '\t');
        let a = parts.next().filter(|s| !s.is_empty());
        let b = parts.next().filter(|s| !s.is_empty());
        match (a, b) {
            (Some(a), Some(b)) => edges.push((a.to_string(), b.to_string())),
            _ => {
                return Err(IngestError::MalformedLine {
                    path: path_string,
                    line_no: idx + 1,
                    line,
                })
            }
        }
    }

    Ok(edges)
}
