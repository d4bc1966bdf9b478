//! Streaming CSV decoder
//!
//! Wraps a `csv_async` reader over any `AsyncRead`. Records are pulled one at a time, so
//! memory use does not depend on the size of the upload.
//!
//! Cells are read as bytes and decoded lossily: a mis-encoded cell (say a Windows-1252
//! export) becomes U+FFFD replacement characters in that row instead of ending the stream.

use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use rowpipe_common::types::RowSnapshot;
use tokio::io::AsyncRead;

use crate::error::DecodeError;
use crate::ingest::types::DecodedRow;

pub struct RowDecoder<R> {
    reader: AsyncReader<R>,
    headers: Vec<String>,
    record: ByteRecord,
    rows_read: u64,
}

impl<R> RowDecoder<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Read the header line and prepare to stream data rows
    pub async fn open(source: R) -> Result<Self, DecodeError> {
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .create_reader(source);

        let headers = reader
            .byte_headers()
            .await?
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();

        Ok(Self {
            reader,
            headers,
            record: ByteRecord::new(),
            rows_read: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Next data row, `None` at end of stream
    ///
    /// Cells beyond the header width are kept under `_<index>` keys; short rows simply lack
    /// the trailing columns.
    pub async fn next_row(&mut self) -> Result<Option<DecodedRow>, DecodeError> {
        if !self.reader.read_byte_record(&mut self.record).await? {
            return Ok(None);
        }

        self.rows_read += 1;

        let fields: RowSnapshot = self
            .record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let key = self
                    .headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("_{}", i));
                (key, String::from_utf8_lossy(value).into_owned())
            })
            .collect();

        Ok(Some(DecodedRow {
            row_number: self.rows_read,
            fields,
        }))
    }
}
