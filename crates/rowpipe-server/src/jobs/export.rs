//! CSV export of a job's recorded errors

use rowpipe_common::types::JobError;

pub const EXPORT_HEADER: &str = "rowNumber,name,email,phone,company,error";

/// Render errors as CSV
///
/// Every field except the row number is double-quoted with embedded quotes doubled. Lines are
/// joined by `\n` with no trailing newline; the header line always ends with one.
pub fn errors_csv(errors: &[JobError]) -> String {
    let rows: Vec<String> = errors
        .iter()
        .map(|e| {
            format!(
                "{},{},{},{},{},{}",
                e.row_number,
                quote(e.field("name")),
                quote(e.field("email")),
                quote(e.field("phone")),
                quote(e.field("company")),
                quote(&e.message),
            )
        })
        .collect();

    format!("{}\n{}", EXPORT_HEADER, rows.join("\n"))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
