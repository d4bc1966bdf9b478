//! Header and row validation

use regex::Regex;
use rowpipe_common::types::JobError;
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

use crate::ingest::types::{CustomerRecord, DecodedRow, ValidRow, REQUIRED_HEADERS};

/// Local part, `@`, dot-separated domain labels, alphabetic TLD of two or more letters
const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$";

// The pattern is a literal; `test_email_pattern_compiles` covers it
#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

pub const NAME_REQUIRED: &str = "name is required";
pub const EMAIL_REQUIRED: &str = "email is required";
pub const EMAIL_INVALID: &str = "invalid email";
pub const COMPANY_REQUIRED: &str = "company is required";

/// Required columns absent from the header line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing required headers: {}", missing.join(", "))]
pub struct HeaderError {
    pub missing: Vec<&'static str>,
}

/// Check the header line once per job; column order does not matter
pub fn validate_headers(headers: &[String]) -> Result<(), HeaderError> {
    let missing: Vec<&'static str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(HeaderError { missing })
    }
}

/// Classifies rows as valid or invalid; holds no per-row state
#[derive(Debug, Clone, Copy)]
pub struct RowValidator {
    email: &'static Regex,
}

impl Default for RowValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RowValidator {
    pub fn new() -> Self {
        Self { email: &EMAIL }
    }

    /// First violated rule, in declared order
    pub fn check(&self, row: &DecodedRow) -> Option<&'static str> {
        let email = row.get("email").trim();

        if row.get("name").trim().is_empty() {
            Some(NAME_REQUIRED)
        } else if email.is_empty() {
            Some(EMAIL_REQUIRED)
        } else if !self.is_valid_email(email) {
            Some(EMAIL_INVALID)
        } else if row.get("company").trim().is_empty() {
            Some(COMPANY_REQUIRED)
        } else {
            None
        }
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        !email.starts_with('.') && !email.contains("..") && self.email.is_match(email)
    }

    /// Turn a row into a customer record, or into the error that rejects it
    pub fn validate(&self, job_id: Uuid, row: DecodedRow) -> Result<ValidRow, JobError> {
        if let Some(message) = self.check(&row) {
            return Err(JobError::for_row(row.row_number, message, row.fields));
        }

        let phone = row.get("phone").trim();
        let record = CustomerRecord {
            job_id,
            name: row.get("name").trim().to_string(),
            email: row.get("email").trim().to_string(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
            company: row.get("company").trim().to_string(),
        };

        Ok(ValidRow {
            source: row,
            record,
        })
    }
}
