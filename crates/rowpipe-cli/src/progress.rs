//! Progress indicators for imports
//!
//! The total row count is only known once the file has been read, so the indicator is a
//! spinner whose position counts processed rows.

use indicatif::{ProgressBar, ProgressStyle};
use rowpipe_common::types::{JobStatus, ProgressEvent};
use rowpipe_server::ingest::Subscription;
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix} [{elapsed_precise}] {pos} rows {msg}";

/// Create the spinner for one import
pub fn create_import_progress(filename: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(filename.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Reflect one progress event on the bar
pub fn render(pb: &ProgressBar, event: &ProgressEvent) {
    pb.set_position(event.processed_rows);
    pb.set_message(format!(
        "({} imported, {} rejected) {}",
        event.success_count, event.failed_count, event.status
    ));
}

/// Follow a job until its terminal update, then stop the bar
pub async fn follow(pb: &ProgressBar, snapshot: ProgressEvent, mut updates: Subscription) {
    render(pb, &snapshot);
    let mut last = snapshot;
    while let Some(event) = updates.next().await {
        render(pb, &event);
        last = event;
    }
    finish(pb, &last);
}

/// Stop the bar, leaving it visible when the job failed
pub fn finish(pb: &ProgressBar, last: &ProgressEvent) {
    match last.status {
        JobStatus::Failed => pb.abandon_with_message(format!(
            "({} imported, {} rejected) failed",
            last.success_count, last.failed_count
        )),
        _ => pb.finish_and_clear(),
    }
}
