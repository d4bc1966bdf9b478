//! Human-readable rendering of job records

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use rowpipe_common::types::Job;
use std::fmt::Write;

/// Multi-line description of one job
pub fn job_details(job: &Job) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job:       {}", job.id);
    let _ = writeln!(out, "File:      {}", job.filename);
    let _ = writeln!(out, "Status:    {}", job.status);
    let _ = writeln!(
        out,
        "Rows:      {} processed ({} imported, {} rejected)",
        job.processed_rows, job.success_count, job.failed_count
    );
    let _ = writeln!(out, "Created:   {}", job.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(completed) = job.completed_at {
        let _ = writeln!(out, "Completed: {}", completed.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if let Some(fatal) = job.errors.iter().find(|e| e.is_fatal()) {
        let _ = writeln!(out, "Failure:   {}", fatal.message);
    }
    let row_errors = job.errors.iter().filter(|e| !e.is_fatal()).count();
    if row_errors > 0 {
        let _ = writeln!(
            out,
            "Errors:    {} recorded, run 'rowpipe errors {}' to export them",
            row_errors, job.id
        );
    }

    out
}

/// Table of jobs, one row each
pub fn jobs_table(jobs: &[Job]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "ID", "File", "Status", "Processed", "Imported", "Rejected", "Created",
        ]);

    for job in jobs {
        table.add_row(vec![
            Cell::new(job.id),
            Cell::new(&job.filename),
            Cell::new(job.status),
            Cell::new(job.processed_rows),
            Cell::new(job.success_count),
            Cell::new(job.failed_count),
            Cell::new(job.created_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }

    table
}

/// One-paragraph summary printed after an import
pub fn import_summary(job: &Job) -> String {
    let mut out = format!(
        "Imported {} of {} rows from '{}' ({} rejected)",
        job.success_count, job.processed_rows, job.filename, job.failed_count
    );
    if let Some(fatal) = job.errors.iter().find(|e| e.is_fatal()) {
        let _ = write!(out, "\nImport failed: {}", fatal.message);
    }
    out
}
