//! Run configuration for the loader and the query tool
//!
//! Built from the parsed command line (see [`crate::cli`]) and validated before
//! the store is touched.

use crate::cli::{LoadArgs, QueryArgs};
use crate::error::{IndexError, Result};
use crate::store::StoreOptions;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

/// Default sizing hint: 1.2 billion, about 20% above the number of UniParc
/// entries the index is built for.
pub const DEFAULT_NUM_BUCKETS: u64 = 1_200_000_000;

/// Default number of keys per multi-get call.
pub const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Default number of input lines between loader progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000_000;

/// What the loader does with a repeated `(external_id, content_hash)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePairs {
    /// Append the id again and count a collision, like any other repeat
    #[default]
    Chain,
    /// Keep the existing chain and count a duplicate instead
    Skip,
}

/// What the loader does with a line that is not exactly two fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLines {
    /// Stop the load with an error
    #[default]
    Abort,
    /// Log a warning, count the line and carry on
    Skip,
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub dbfile: PathBuf,
    pub num_buckets: u64,
    pub sync_hard: bool,
    pub progress_every: u64,
    pub malformed: MalformedLines,
    pub duplicates: DuplicatePairs,
    pub summary: Option<PathBuf>,
}

impl LoadConfig {
    /// Configuration with default settings for `dbfile`
    pub fn new(dbfile: impl Into<PathBuf>) -> Self {
        Self {
            dbfile: dbfile.into(),
            num_buckets: DEFAULT_NUM_BUCKETS,
            sync_hard: true,
            progress_every: DEFAULT_PROGRESS_INTERVAL,
            malformed: MalformedLines::Abort,
            duplicates: DuplicatePairs::Chain,
            summary: None,
        }
    }

    /// Build from parsed command-line arguments
    pub fn from_args(args: &LoadArgs) -> Result<Self> {
        let config = Self {
            dbfile: args.dbfile.clone(),
            num_buckets: args.dbsize,
            sync_hard: !args.no_sync,
            progress_every: args.progress_every,
            malformed: if args.skip_malformed {
                MalformedLines::Skip
            } else {
                MalformedLines::Abort
            },
            duplicates: args.duplicate_pairs,
            summary: args.summary.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dbfile.as_os_str().is_empty() {
            return Err(IndexError::config("--dbfile must not be empty"));
        }
        if self.num_buckets == 0 {
            return Err(IndexError::config("--dbsize must be positive"));
        }
        if self.progress_every == 0 {
            return Err(IndexError::config("--progress-every must be positive"));
        }
        Ok(())
    }

    /// Store options: created or truncated, exclusive, no-wait
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            sync_hard: self.sync_hard,
            ..StoreOptions::create_truncate(&self.dbfile, self.num_buckets)
        }
    }
}

/// Query tool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub dbfile: PathBuf,
    pub batch_size: usize,
    pub summary: Option<PathBuf>,
}

impl QueryConfig {
    /// Configuration with default settings for `dbfile`
    pub fn new(dbfile: impl Into<PathBuf>) -> Self {
        Self {
            dbfile: dbfile.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            summary: None,
        }
    }

    /// Build from parsed command-line arguments
    pub fn from_args(args: &QueryArgs) -> Result<Self> {
        let batch_size = usize::try_from(args.batch)
            .map_err(|_| IndexError::config(format!("--batch {} is too large", args.batch)))?;

        let config = Self {
            dbfile: args.dbfile.clone(),
            batch_size,
            summary: args.summary.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dbfile.as_os_str().is_empty() {
            return Err(IndexError::config("--dbfile must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(IndexError::config("--batch must be positive"));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::read_only(&self.dbfile)
    }
}
