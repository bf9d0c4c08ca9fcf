//! UniParc hash index
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Builds and queries a persistent index from content hashes (e.g. sequence
//! MD5s) to the UniParc accessions that carry them.
//!
//! # Overview
//!
//! - **Loader** (`uniparc-load`): reads `<external_id> <content_hash>` lines
//!   and stores `hash -> id`. Hashes seen more than once keep every id, joined
//!   by tabs in input order.
//! - **Query tool** (`uniparc-query`): reads one hash per line, resolves them
//!   in batches and prints `hash<TAB>ids` for every hit.
//! - **Store**: a single SQLite file behind the [`store::KvStore`] trait.
//!
//! # Example
//!
//! ```no_run
//! use uniparc_index::config::{LoadConfig, QueryConfig};
//! use uniparc_index::{loader, query};
//!
//! fn main() -> uniparc_index::Result<()> {
//!     let input = "UPI0000000001 D41D8CD98F00B204E9800998ECF8427E\n";
//!     loader::run(&LoadConfig::new("/dev/shm/uniparc.db"), input.as_bytes())?;
//!
//!     let keys = "d41d8cd98f00b204e9800998ecf8427e\n";
//!     query::run(&QueryConfig::new("/dev/shm/uniparc.db"), keys.as_bytes(), std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod progress;
pub mod query;
pub mod store;
pub mod summary;
pub mod value;

// Re-export commonly used types
pub use error::{IndexError, Result};
pub use store::{KvStore, SqliteStore, StoreOptions};
pub use value::{ContentHash, ExternalId, ExternalIds, OneOrMany};
