//! JSON run summaries
//!
//! Written on request (`--summary <path>`) at the end of a successful run so
//! that pipelines can pick up counts without scraping stderr.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a loader run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub dbfile: PathBuf,
    pub num_buckets: u64,
    /// Records written to the store
    pub records: u64,
    /// Records whose hash was already present
    pub collisions: u64,
    /// Repeated pairs left out under `--duplicate-pairs skip`
    pub duplicates: u64,
    /// Malformed lines skipped under `--skip-malformed`
    pub skipped: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Outcome of a query run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub dbfile: PathBuf,
    pub batch_size: usize,
    pub queried: u64,
    pub found: u64,
    pub non_unique: u64,
    pub batches: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Write `summary` as pretty-printed JSON
pub fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;

    info!(path = %path.display(), "Run summary written");
    Ok(())
}
