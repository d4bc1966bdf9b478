//! Records flowing between the pipeline stages

use rowpipe_common::types::{JobError, RowSnapshot};
use uuid::Uuid;

/// Columns every upload must carry, in the order they are reported
pub const REQUIRED_HEADERS: [&str; 4] = ["name", "email", "phone", "company"];

/// One data row as decoded from the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    /// 1-based position among data rows (the header line is not counted)
    pub row_number: u64,
    pub fields: RowSnapshot,
}

impl DecodedRow {
    /// Cell value by column name, empty when the column is absent
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Customer ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub job_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: String,
}

/// A row that passed validation, with its source kept for error reporting
#[derive(Debug, Clone)]
pub struct ValidRow {
    pub source: DecodedRow,
    pub record: CustomerRecord,
}

impl ValidRow {
    pub fn reject(self, message: impl Into<String>) -> JobError {
        JobError::for_row(self.source.row_number, message, self.source.fields)
    }
}

/// What one batch contributed to the job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub rows: u64,
    pub success_count: u64,
    pub failed_count: u64,
    /// Row errors of this batch, ordered by row number
    pub errors: Vec<JobError>,
}

impl BatchOutcome {
    pub fn new(rows: u64) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn fail(&mut self, error: JobError) {
        self.failed_count += 1;
        self.errors.push(error);
    }

    pub fn succeed(&mut self, count: u64) {
        self.success_count += count;
    }

    /// Sort errors by row number; rejections from later stages land among earlier ones
    pub fn finish(mut self) -> Self {
        self.errors.sort_by_key(|e| e.row_number);
        self
    }
}
