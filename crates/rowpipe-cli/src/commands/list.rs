//! `rowpipe list` command implementation

use rowpipe_server::jobs::JobStore;

use crate::context::Context;
use crate::error::Result;
use crate::output::jobs_table;

/// Show the most recent jobs, newest first
pub async fn run(ctx: &Context, limit: usize) -> Result<()> {
    let store = ctx.connect().await?;
    let jobs = store
        .list_jobs(limit)
        .await?;

    if jobs.is_empty() {
        println!("No jobs found.");
        println!("Run 'rowpipe submit <FILE>' to queue one.");
        return Ok(());
    }

    println!("{}", jobs_table(&jobs));
    Ok(())
}
