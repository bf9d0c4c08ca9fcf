//! uniparc-load - build a UniParc hash index from stdin

use clap::Parser;
use std::io::BufReader;
use std::process;
use tracing::error;
use uniparc_common::logging::{init_logging, LogConfig, LogLevel};
use uniparc_index::cli::LoadArgs;
use uniparc_index::config::LoadConfig;
use uniparc_index::loader;

const STDIN_BUFFER_SIZE: usize = 1 << 20;

fn main() {
    let args = LoadArgs::parse();

    let log_config = LogConfig::builder()
        .level(if args.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("uniparc-load")
        .build();

    // Environment variables take precedence
    let (log_config, env_error) = log_config.with_env_overrides_or_keep();
    if let Some(e) = env_error {
        eprintln!("Warning: ignoring logging environment overrides: {:#}", e);
    }

    // The loader must work even when logging cannot be set up
    let logging = init_logging(&log_config);
    if let Err(ref e) = logging {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let result = LoadConfig::from_args(&args).and_then(|config| {
        let stdin = std::io::stdin();
        loader::run(&config, BufReader::with_capacity(STDIN_BUFFER_SIZE, stdin.lock()))
    });

    if let Err(e) = result {
        match logging {
            Ok(guard) => {
                error!(error = %e, "Load failed");
                drop(guard);
            },
            Err(_) => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}
