//! rowpipe CLI Library
//!
//! Command-line front end for the rowpipe ingestion engine.
//!
//! # Overview
//!
//! - **Submission**: hand a CSV file to the worker queue (`rowpipe submit`)
//! - **Direct Import**: process a file in this process with live progress (`rowpipe import`)
//! - **Inspection**: show one job or the most recent ones (`rowpipe status`, `rowpipe list`)
//! - **Error Export**: download the rejected rows of a job as CSV (`rowpipe errors`)
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod context;
pub mod error;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use context::Context;
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Default number of jobs shown by `rowpipe list`
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// rowpipe - streaming CSV ingestion
#[derive(Parser, Debug)]
#[command(name = "rowpipe")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue a CSV file for the worker and print the job id
    Submit {
        /// CSV file with name, email, phone and company columns
        file: PathBuf,
    },

    /// Import a CSV file in this process, showing live progress
    Import {
        /// CSV file with name, email, phone and company columns
        file: PathBuf,

        /// Keep jobs and customers in memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
    },

    /// Show one job
    Status {
        /// Job id
        job_id: Uuid,

        /// Print the job record as JSON
        #[arg(long)]
        json: bool,

        /// Poll the job and show its progress until it finishes
        #[arg(short, long)]
        follow: bool,
    },

    /// List the most recent jobs
    List {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Export the rejected rows of a job as CSV
    Errors {
        /// Job id
        job_id: Uuid,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import_in_memory() {
        let cli = Cli::try_parse_from(["rowpipe", "import", "people.csv", "--in-memory"]).unwrap();
        match cli.command {
            Commands::Import { file, in_memory } => {
                assert_eq!(file, PathBuf::from("people.csv"));
                assert!(in_memory);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rowpipe",
            "list",
            "--verbose",
            "--database-url",
            "postgresql://db/rowpipe",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://db/rowpipe"));
        assert!(matches!(cli.command, Commands::List { limit: DEFAULT_LIST_LIMIT }));
    }

    #[test]
    fn test_parse_status_follow() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["rowpipe", "status", &id.to_string(), "-f"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status { job_id, json: false, follow: true } if job_id == id
        ));
    }

    #[test]
    fn test_job_id_must_be_a_uuid() {
        assert!(Cli::try_parse_from(["rowpipe", "status", "not-a-uuid"]).is_err());

        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["rowpipe", "errors", &id.to_string(), "-o", "out.csv"]).unwrap();
        match cli.command {
            Commands::Errors { job_id, output } => {
                assert_eq!(job_id, id);
                assert_eq!(output, Some(PathBuf::from("out.csv")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
