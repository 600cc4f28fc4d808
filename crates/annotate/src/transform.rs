//! Tabular transform: append a `has_email` column.

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use thiserror::Error;

use crate::email::contains_email;
use crate::quoting::check_quoting;

/// Label appended to the header record.
pub const HAS_EMAIL_HEADER: &str = "has_email";

const DELIMITER: u8 = b',';

/// Transform failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    /// Input could not be read as tabular data (ragged records, a bare or
    /// unterminated quote, text after a closing quote, non-UTF-8 bytes).
    #[error("parse error: {message}")]
    Parse { line: Option<u64>, message: String },

    /// Output could not be encoded.
    #[error("write error: {0}")]
    Write(String),
}

impl From<csv::Error> for TransformError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        Self::Parse {
            line,
            message: err.to_string(),
        }
    }
}

/// Bytes-in, bytes-out row transform invoked by the worker.
pub trait RowTransformer: Send + Sync {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, TransformError>;
}

/// The single production transform: flag rows that contain an email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFlagTransformer;

impl RowTransformer for EmailFlagTransformer {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        annotate(input)
    }
}

/// Append [`HAS_EMAIL_HEADER`] to the first record and `true`/`false` to every
/// following record.
///
/// Zero records in means zero bytes out. Output is built in memory and only
/// returned once every record has been written, so a parse error never yields
/// partial output.
pub fn annotate(input: &[u8]) -> Result<Vec<u8>, TransformError> {
    check_quoting(input, DELIMITER)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(false)
        .from_reader(input);

    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(input.len() + input.len() / 8));

    let mut record = StringRecord::new();
    let mut is_header = true;

    while reader.read_record(&mut record)? {
        let flag = if is_header {
            is_header = false;
            HAS_EMAIL_HEADER
        } else if record.iter().any(contains_email) {
            "true"
        } else {
            "false"
        };
        record.push_field(flag);
        writer
            .write_record(&record)
            .map_err(|e| TransformError::Write(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| TransformError::Write(e.to_string()))
}
