//! Batched lookup of content hashes
//!
//! Keys are read one per line, uppercased, and resolved in batches with one
//! `get_multi` call each. Hits are written as `key<TAB>value`, sorted by key
//! within the batch; misses produce no output.

use crate::config::QueryConfig;
use crate::error::Result;
use crate::store::{KvStore, SqliteStore};
use crate::summary::{write_summary, QuerySummary};
use crate::value::{is_collision_value, ContentHash};
use std::io::{BufRead, BufWriter, Write};
use tracing::{debug, info, info_span};
use uniparc_common::Stopwatch;

/// Counters kept during a query run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Key lines read
    pub queried: u64,
    /// Lines written
    pub found: u64,
    /// Lines written whose value chains several ids
    pub non_unique: u64,
    /// Multi-get calls made
    pub batches: u64,
}

/// Resolve one batch and write its hits. Clears `batch`.
fn flush_batch<S, W>(
    store: &S,
    batch: &mut Vec<String>,
    output: &mut W,
    stats: &mut QueryStats,
) -> Result<()>
where
    S: KvStore,
    W: Write,
{
    let mut hits: Vec<(String, String)> = store.get_multi(batch)?.into_iter().collect();
    batch.clear();
    stats.batches += 1;

    hits.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in hits {
        if is_collision_value(&value) {
            stats.non_unique += 1;
        }
        stats.found += 1;
        writeln!(output, "{}\t{}", key, value)?;
    }

    Ok(())
}

/// Look up every key line from `input` and write hits to `output`.
pub fn query_keys<S, R, W>(
    store: &S,
    mut input: R,
    output: &mut W,
    batch_size: usize,
    watch: &Stopwatch,
) -> Result<QueryStats>
where
    S: KvStore,
    R: BufRead,
    W: Write,
{
    let batch_size = batch_size.max(1);
    let mut stats = QueryStats::default();
    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut buf = Vec::with_capacity(64);

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        stats.queried += 1;

        // Undecodable bytes become U+FFFD, so such a key simply never matches.
        let key = ContentHash::canonical(&String::from_utf8_lossy(&buf));
        batch.push(key.into_string());

        if batch.len() == batch_size {
            flush_batch(store, &mut batch, output, &mut stats)?;
            info!(
                queried = stats.queried,
                found = stats.found,
                non_unique = stats.non_unique,
                elapsed = %watch,
                "Queried {} times, found {}, non unique {}",
                stats.queried,
                stats.found,
                stats.non_unique
            );
        }
    }

    if !batch.is_empty() {
        flush_batch(store, &mut batch, output, &mut stats)?;
    }

    output.flush()?;
    Ok(stats)
}

/// Query the index at `config.dbfile` with keys from `input`, writing hits
/// to `output`.
pub fn run<R, W>(config: &QueryConfig, input: R, output: W) -> Result<QuerySummary>
where
    R: BufRead,
    W: Write,
{
    config.validate()?;

    let watch = Stopwatch::start();
    let span = info_span!("query", dbfile = %config.dbfile.display());
    let _enter = span.enter();

    info!("Opening store");
    let store = SqliteStore::open(&config.store_options())?;
    info!(elapsed = %watch, "Store open OK, querying");
    if let Some(num_buckets) = store.num_buckets()? {
        debug!(num_buckets, "Store sizing");
    }

    let mut output = BufWriter::new(output);
    let stats = query_keys(&store, input, &mut output, config.batch_size, &watch)?;
    drop(output);

    info!(
        queried = stats.queried,
        found = stats.found,
        non_unique = stats.non_unique,
        batches = stats.batches,
        elapsed = %watch,
        "Queried {} times, found {}, non unique {}, closing store",
        stats.queried,
        stats.found,
        stats.non_unique
    );
    store.close()?;
    info!(elapsed = %watch, "Store close OK");

    let summary = QuerySummary {
        dbfile: config.dbfile.clone(),
        batch_size: config.batch_size,
        queried: stats.queried,
        found: stats.found,
        non_unique: stats.non_unique,
        batches: stats.batches,
        started_at: watch.started_at(),
        elapsed_ms: watch.elapsed_ms(),
    };

    if let Some(path) = &config.summary {
        write_summary(path, &summary)?;
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn store_with(entries: &[(&str, &str)]) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for (key, value) in entries {
            store.set(key, value).unwrap();
        }
        store
    }

    fn query(store: &SqliteStore, input: &str, batch_size: usize) -> (String, QueryStats) {
        let mut output = Vec::new();
        let stats = query_keys(
            store,
            input.as_bytes(),
            &mut output,
            batch_size,
            &Stopwatch::start(),
        )
        .unwrap();
        (String::from_utf8(output).unwrap(), stats)
    }

    #[test]
    fn test_single_hit() {
        let store = store_with(&[("AAAA", "id1")]);
        let (output, stats) = query(&store, "AAAA\n", 10);

        assert_eq!(output, "AAAA\tid1\n");
        assert_eq!(stats.found, 1);
        assert_eq!(stats.non_unique, 0);
    }

    #[test]
    fn test_chain_printed_verbatim_and_counted() {
        let store = store_with(&[("H", "id1\tid2\tid3"), ("G", "id4")]);
        let (output, stats) = query(&store, "H\nG\n", 10);

        assert_eq!(output, "G\tid4\nH\tid1\tid2\tid3\n");
        assert_eq!(stats.found, 2);
        assert_eq!(stats.non_unique, 1);
    }

    #[test]
    fn test_missing_keys_are_silent() {
        let store = store_with(&[("AAAA", "id1")]);
        let (output, stats) = query(&store, "ZZZZ\nAAAA\nYYYY\n", 10);

        assert_eq!(output, "AAAA\tid1\n");
        assert_eq!(stats.queried, 3);
        assert_eq!(stats.found, 1);
    }

    #[test]
    fn test_keys_are_uppercased() {
        let store = store_with(&[("ABCDEF", "id1")]);
        let (output, _) = query(&store, "abcdef\n  AbCdEf  \n", 1);

        assert_eq!(output, "ABCDEF\tid1\nABCDEF\tid1\n");
    }

    #[test]
    fn test_lowercase_stored_keys_are_unreachable() {
        let store = store_with(&[("abcdef", "id1")]);
        let (output, stats) = query(&store, "abcdef\n", 10);

        assert!(output.is_empty());
        assert_eq!(stats.found, 0);
    }

    #[test]
    fn test_malformed_keys_not_found() {
        let store = store_with(&[("AAAA", "id1")]);
        let (output, stats) = query(&store, "AAAA BBBB\n\n\t\n", 10);

        assert!(output.is_empty());
        assert_eq!(stats.queried, 3);
        assert_eq!(stats.found, 0);
    }

    #[test]
    fn test_invalid_utf8_key_not_found() {
        let store = store_with(&[("AAAA", "id1")]);
        let mut output = Vec::new();
        let input: &[u8] = b"AA\xffAA\nAAAA\n";
        let stats = query_keys(&store, input, &mut output, 10, &Stopwatch::start()).unwrap();

        assert_eq!(output, b"AAAA\tid1\n");
        assert_eq!(stats.found, 1);
    }

    #[test]
    fn test_sorted_within_batch_only() {
        let store = store_with(&[("A", "1"), ("B", "2"), ("C", "3"), ("D", "4")]);
        let (output, stats) = query(&store, "D\nC\nB\nA\n", 2);

        assert_eq!(output, "C\t3\nD\t4\nA\t1\nB\t2\n");
        assert_eq!(stats.batches, 2);
    }

    #[test]
    fn test_repeated_key_within_batch_printed_once() {
        let store = store_with(&[("A", "1")]);
        let (output, stats) = query(&store, "A\na\n", 10);

        assert_eq!(output, "A\t1\n");
        assert_eq!(stats.queried, 2);
        assert_eq!(stats.found, 1);
    }

    #[test]
    fn test_empty_input() {
        let store = store_with(&[("A", "1")]);
        let (output, stats) = query(&store, "", 10);

        assert!(output.is_empty());
        assert_eq!(stats, QueryStats::default());
    }

    #[test]
    fn test_partial_final_batch() {
        let store = store_with(&[("A", "1"), ("B", "2"), ("C", "3")]);
        let (output, stats) = query(&store, "A\nB\nC", 2);

        assert_eq!(output.lines().count(), 3);
        assert_eq!(stats.batches, 2);
    }

    fn pairs(output: &str) -> BTreeSet<String> {
        output.lines().map(str::to_string).collect()
    }

    proptest! {
        #[test]
        fn prop_output_independent_of_batch_size(
            stored in proptest::collection::btree_map("[A-F0-9]{4}", "[A-Z0-9]{3}(\t[A-Z0-9]{3}){0,2}", 0..40),
            probes in proptest::collection::vec("[a-fA-F0-9]{4}", 0..60),
            batch in 1usize..20,
        ) {
            let store = {
                let mut store = SqliteStore::open_in_memory().unwrap();
                for (key, value) in &stored {
                    store.set(key, value).unwrap();
                }
                store
            };
            let input: String = probes.iter().map(|p| format!("{}\n", p)).collect();

            let (single, single_stats) = query(&store, &input, 10_000);
            let (batched, _) = query(&store, &input, batch);

            prop_assert_eq!(pairs(&single), pairs(&batched));

            let non_unique_lines = single.lines().filter(|l| l.matches('\t').count() > 1).count();
            prop_assert_eq!(single_stats.non_unique, non_unique_lines as u64);
        }
    }
}
