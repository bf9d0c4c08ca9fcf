//! Bulk loader: `<external_id> <content_hash>` lines into the index
//!
//! One linear pass over the input. Every record is written with
//! `set_and_get`; when the hash already held a value the record is a
//! collision and the key is rewritten with the new id appended to the
//! existing chain, so after the run each hash maps to all of its ids in
//! first-seen order.

use crate::config::{DuplicatePairs, LoadConfig, MalformedLines};
use crate::error::{IndexError, Result};
use crate::progress::create_record_counter;
use crate::store::{KvStore, SqliteStore};
use crate::summary::{write_summary, LoadSummary};
use crate::value::{ContentHash, ExternalId, ExternalIds};
use indicatif::ProgressBar;
use std::io::BufRead;
use tracing::{debug, info, info_span, warn};
use uniparc_common::Stopwatch;

/// Counters kept during a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Input lines read, including skipped ones
    pub lines: u64,
    pub records: u64,
    /// Distinct hashes stored
    pub keys: u64,
    pub collisions: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

impl LoadStats {
    /// More distinct hashes stored than the store was sized for
    pub fn exceeds_capacity(&self, num_buckets: u64) -> bool {
        self.keys > num_buckets
    }
}

/// Split a line into `(external_id, content_hash)`.
/// Returns `None` unless there are exactly two whitespace-separated fields.
pub fn parse_record(line: &str) -> Option<(ExternalId, ContentHash)> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(hash), None) => Some((ExternalId::new(id), ContentHash::new(hash))),
        _ => None,
    }
}

/// Write one record, merging it with whatever the hash already holds.
fn insert_record<S: KvStore>(
    store: &mut S,
    id: &ExternalId,
    hash: &ContentHash,
    duplicates: DuplicatePairs,
    stats: &mut LoadStats,
) -> Result<()> {
    let previous = store.set_and_get(hash.as_str(), id.as_str())?;

    let Some(previous) = previous.filter(|v| !v.is_empty()) else {
        stats.records += 1;
        stats.keys += 1;
        return Ok(());
    };

    let chain = ExternalIds::decode(&previous);
    if duplicates == DuplicatePairs::Skip && chain.contains(id) {
        // set_and_get already overwrote the chain with the bare id
        store.set(hash.as_str(), &previous)?;
        stats.duplicates += 1;
        debug!(hash = %hash, id = %id, "Duplicate pair skipped");
        return Ok(());
    }

    let extended = chain.appended(id.clone()).encode();
    store.set(hash.as_str(), &extended)?;
    stats.records += 1;
    stats.collisions += 1;
    debug!(hash = %hash, chain = ?extended, "Collision");

    Ok(())
}

/// Load every record from `input` into `store`.
///
/// Stops at the first malformed line unless `config.malformed` is
/// [`MalformedLines::Skip`]. The store is left open; the caller decides
/// whether to close (commit) it.
pub fn load_records<S, R>(
    store: &mut S,
    mut input: R,
    config: &LoadConfig,
    progress: &ProgressBar,
    watch: &Stopwatch,
) -> Result<LoadStats>
where
    S: KvStore,
    R: BufRead,
{
    config.validate()?;

    let mut stats = LoadStats::default();
    let mut buf = Vec::with_capacity(128);
    let mut capacity_warned = false;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        stats.lines += 1;

        let record = std::str::from_utf8(&buf).ok().and_then(parse_record);
        match record {
            Some((id, hash)) => {
                insert_record(store, &id, &hash, config.duplicates, &mut stats)?;
                progress.inc(1);
            },
            None => match config.malformed {
                MalformedLines::Abort => {
                    return Err(IndexError::malformed_input(stats.lines, &buf));
                },
                MalformedLines::Skip => {
                    stats.skipped += 1;
                    warn!(
                        line = stats.lines,
                        content = %String::from_utf8_lossy(&buf).trim_end(),
                        "Skipping malformed line"
                    );
                },
            },
        }

        if !capacity_warned && stats.exceeds_capacity(config.num_buckets) {
            capacity_warned = true;
            warn!(
                keys = stats.keys,
                num_buckets = config.num_buckets,
                "More hashes than the store was sized for; rebuild with a larger --dbsize"
            );
        }

        if stats.lines % config.progress_every == 0 {
            info!(
                records = stats.records,
                collisions = stats.collisions,
                elapsed = %watch,
                "Loaded {} records ({} collisions)",
                stats.records,
                stats.collisions
            );
        }
    }

    Ok(stats)
}

/// Build the index at `config.dbfile` from `input`.
///
/// The store is truncated on open and only committed when every line has
/// been loaded. On error it is dropped unclosed, which rolls back the
/// truncation as well, leaving the file as it was before the run.
pub fn run<R: BufRead>(config: &LoadConfig, input: R) -> Result<LoadSummary> {
    config.validate()?;

    let watch = Stopwatch::start();
    let span = info_span!("load", dbfile = %config.dbfile.display());
    let _enter = span.enter();

    info!(num_buckets = config.num_buckets, "Opening store");
    let mut store = SqliteStore::open(&config.store_options())?;
    info!(elapsed = %watch, "Store open OK, loading");

    let progress = create_record_counter("Loading records");
    let result = load_records(&mut store, input, config, &progress, &watch);
    progress.finish_and_clear();
    let stats = result?;

    info!(
        records = stats.records,
        collisions = stats.collisions,
        duplicates = stats.duplicates,
        skipped = stats.skipped,
        elapsed = %watch,
        "Loaded {} records ({} collisions), closing store",
        stats.records,
        stats.collisions
    );
    store.close()?;
    info!(elapsed = %watch, "Store close OK");

    let summary = LoadSummary {
        dbfile: config.dbfile.clone(),
        num_buckets: config.num_buckets,
        records: stats.records,
        collisions: stats.collisions,
        duplicates: stats.duplicates,
        skipped: stats.skipped,
        started_at: watch.started_at(),
        elapsed_ms: watch.elapsed_ms(),
    };

    if let Some(path) = &config.summary {
        write_summary(path, &summary)?;
    }

    Ok(summary)
}
