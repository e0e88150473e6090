// src/progress.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while one stage of the command line tool runs.
pub fn spinner_progress(label: impl Into<String>, message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold.dim} {spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(label.into());
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}

/// Stops `pb` and leaves `message` in its place.
pub fn finish_progress(pb: &ProgressBar, message: impl Into<String>) {
    pb.finish_with_message(message.into());
}
