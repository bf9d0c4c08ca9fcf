//! uniparc-query - look up content hashes in a UniParc hash index

use clap::Parser;
use std::io::BufReader;
use std::process;
use tracing::error;
use uniparc_common::logging::{init_logging, LogConfig, LogLevel};
use uniparc_index::cli::QueryArgs;
use uniparc_index::config::QueryConfig;
use uniparc_index::query;

fn main() {
    let args = QueryArgs::parse();

    let log_config = LogConfig::builder()
        .level(if args.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("uniparc-query")
        .build();

    // Environment variables take precedence
    let (log_config, env_error) = log_config.with_env_overrides_or_keep();
    if let Some(e) = env_error {
        eprintln!("Warning: ignoring logging environment overrides: {:#}", e);
    }

    let logging = init_logging(&log_config);
    if let Err(ref e) = logging {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let result = QueryConfig::from_args(&args).and_then(|config| {
        let stdin = std::io::stdin();
        query::run(&config, BufReader::new(stdin.lock()), std::io::stdout().lock())
    });

    if let Err(e) = result {
        match logging {
            Ok(guard) => {
                error!(error = %e, "Query failed");
                drop(guard);
            },
            Err(_) => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}
