//! rowpipe CLI - Main entry point

use clap::Parser;
use rowpipe_cli::{commands, Cli, Commands, Context};
use rowpipe_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Verbose mode logs debug to the console; otherwise only warnings, so output stays scriptable
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("rowpipe-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _log_guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> rowpipe_cli::Result<()> {
    let ctx = Context::load(cli.database_url)?;

    match cli.command {
        Commands::Submit { file } => commands::submit::run(&ctx, &file).await,

        Commands::Import { file, in_memory } => {
            commands::import::run(&ctx, &file, in_memory).await
        }

        Commands::Status {
            job_id,
            json,
            follow,
        } => commands::status::run(&ctx, job_id, json, follow).await,

        Commands::List { limit } => commands::list::run(&ctx, limit).await,

        Commands::Errors { job_id, output } => {
            commands::errors::run(&ctx, job_id, output.as_deref()).await
        }
    }
}
