//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod errors;
pub mod import;
pub mod list;
pub mod status;
pub mod submit;

use std::path::Path;

use crate::error::{CliError, Result};

/// Reject paths that do not name a readable regular file
fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::file_not_found(path))
    }
}

/// Name recorded on the job: the file name without its directory
fn display_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_directories() {
        assert_eq!(display_name(Path::new("/data/in/people.csv")), Some("people.csv"));
        assert_eq!(display_name(Path::new("/")), None);
    }

    #[test]
    fn test_ensure_file_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ensure_file(dir.path()), Err(CliError::FileNotFound(_))));

        let file = dir.path().join("people.csv");
        std::fs::write(&file, "name,email,phone,company\n").unwrap();
        assert!(ensure_file(&file).is_ok());
    }
}
