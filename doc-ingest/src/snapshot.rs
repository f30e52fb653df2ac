//! Local index snapshot: one JSON line per ingested document in
//! `<INDEX_PERSIST_DIR>/documents.jsonl`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::IngestError;

pub const SNAPSHOT_FILE: &str = "documents.jsonl";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub doc_id: String,
    pub filename: String,
    pub pages: usize,
    pub chunks: usize,
    pub collection: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct IndexSnapshot {
    path: PathBuf,
}

impl IndexSnapshot {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the directory and file on first use.
    pub async fn append(&self, entry: &SnapshotEntry) -> Result<(), IngestError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| IngestError::io(dir, e))?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| IngestError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| IngestError::io(&self.path, e))?;
        debug!(path = %self.path.display(), doc_id = %entry.doc_id, "snapshot appended");
        Ok(())
    }

    /// Read every entry. Missing file → empty; malformed lines are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<SnapshotEntry>, IngestError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IngestError::io(&self.path, e)),
        };

        let mut out = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| IngestError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SnapshotEntry>(&line) {
                Ok(entry) => out.push(entry),
                Err(e) => warn!(line = i + 1, error = %e, "skipping malformed snapshot line"),
            }
        }
        Ok(out)
    }
}
