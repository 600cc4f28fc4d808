//! Strict quote validation.
//!
//! The `csv` reader is lenient about quotes: a bare `"` inside an unquoted
//! field, text after a closing quote and an unterminated quoted field are all
//! accepted and silently rewritten. Those inputs are rejected here before any
//! record is read, so a malformed upload fails instead of completing with
//! altered data.

use crate::transform::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the first byte of a field.
    FieldStart,
    /// Inside a field that did not open with a quote.
    Unquoted,
    /// Inside a quoted field.
    Quoted,
    /// Just read a `"` inside a quoted field: either an escaped quote or the
    /// closing one.
    QuoteInQuoted,
}

/// Reject quoting the lenient reader would accept. `delimiter` is the field
/// separator; `\n` and `\r` end a record.
pub(crate) fn check_quoting(input: &[u8], delimiter: u8) -> Result<(), TransformError> {
    let mut state = State::FieldStart;
    let mut line: u64 = 1;
    let mut quote_opened_at: u64 = 1;

    for &byte in input {
        state = match (state, byte) {
            (State::FieldStart, b'"') => {
                quote_opened_at = line;
                State::Quoted
            }
            (State::FieldStart | State::Unquoted | State::QuoteInQuoted, b) if b == delimiter => {
                State::FieldStart
            }
            (State::FieldStart | State::Unquoted | State::QuoteInQuoted, b'\n' | b'\r') => {
                State::FieldStart
            }
            (State::FieldStart | State::Unquoted, _) if byte == b'"' => {
                return Err(parse_error(line, "bare \" in non-quoted field"));
            }
            (State::FieldStart | State::Unquoted, _) => State::Unquoted,
            (State::Quoted, b'"') => State::QuoteInQuoted,
            (State::Quoted, _) => State::Quoted,
            (State::QuoteInQuoted, b'"') => State::Quoted,
            (State::QuoteInQuoted, _) => {
                return Err(parse_error(line, "extraneous text after closing quote"));
            }
        };

        if byte == b'\n' {
            line += 1;
        }
    }

    if state == State::Quoted {
        return Err(parse_error(quote_opened_at, "quoted field is never closed"));
    }
    Ok(())
}

fn parse_error(line: u64, what: &str) -> TransformError {
    TransformError::Parse {
        line: Some(line),
        message: format!("{what} (line {line})"),
    }
}
