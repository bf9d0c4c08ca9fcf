//! Command-line definitions for `uniparc-load` and `uniparc-query`
//!
//! Kept in the library so the documentation generator can render them.

use crate::config::{
    DuplicatePairs, DEFAULT_BATCH_SIZE, DEFAULT_NUM_BUCKETS, DEFAULT_PROGRESS_INTERVAL,
};
use clap::Parser;
use std::path::PathBuf;

/// Build a UniParc hash index from `<external_id> <content_hash>` lines on stdin.
///
/// Every content hash maps to the external ids that share it. When a hash is
/// seen more than once the ids are chained in input order, separated by tabs.
#[derive(Parser, Debug)]
#[command(name = "uniparc-load")]
#[command(author, version, about, long_about = None)]
pub struct LoadArgs {
    /// Store file. Created if missing, truncated if present. Building in
    /// /dev/shm and copying the finished file to permanent storage is much
    /// faster for large loads.
    #[arg(long, env = "UNIPARC_DBFILE")]
    pub dbfile: PathBuf,

    /// Number of entries the store is sized for; ideally about 20% more than
    /// the records you expect. Only applied when the store is created.
    #[arg(
        long,
        env = "UNIPARC_DBSIZE",
        default_value_t = DEFAULT_NUM_BUCKETS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub dbsize: u64,

    /// Input lines between progress reports
    #[arg(
        long,
        default_value_t = DEFAULT_PROGRESS_INTERVAL,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub progress_every: u64,

    /// Warn about and skip lines that are not exactly two fields instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,

    /// Handling of a repeated (external_id, content_hash) pair
    #[arg(long, value_enum, default_value_t = DuplicatePairs::Chain)]
    pub duplicate_pairs: DuplicatePairs,

    /// Do not sync writes to disk on commit
    #[arg(long)]
    pub no_sync: bool,

    /// Write a JSON run summary to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Verbose output (logs every collision)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Look up content hashes from stdin in a UniParc hash index.
///
/// Prints `<hash>\t<external_id>[\t<external_id>...]` for every hash found.
/// Hashes are uppercased before lookup; hashes not in the index are skipped.
#[derive(Parser, Debug)]
#[command(name = "uniparc-query")]
#[command(author, version, about, long_about = None)]
pub struct QueryArgs {
    /// Store file built by uniparc-load (opened read-only)
    #[arg(long, env = "UNIPARC_DBFILE")]
    pub dbfile: PathBuf,

    /// Keys per lookup batch
    #[arg(
        long,
        env = "UNIPARC_BATCH",
        default_value_t = DEFAULT_BATCH_SIZE as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub batch: u64,

    /// Write a JSON run summary to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
