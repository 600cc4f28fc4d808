//! Row annotation (pure transform).
//!
//! Parses delimited, quote-aware tabular bytes and appends one trailing
//! column per record: the header gets a fixed label, every data row gets
//! `true`/`false` depending on whether any of its fields contains an
//! email-shaped token. No IO, no storage.

pub mod email;
mod quoting;
pub mod transform;

pub use email::contains_email;
pub use transform::{annotate, EmailFlagTransformer, RowTransformer, TransformError, HAS_EMAIL_HEADER};
