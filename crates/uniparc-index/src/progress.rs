//! Progress indicator for long loads
//!
//! Drawn on stderr only when it is a terminal; redirected runs rely on the
//! periodic log lines instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a spinner counting processed records
pub fn create_record_counter(message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(4));
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}: {human_pos} ({per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
