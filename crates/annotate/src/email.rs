//! Email-shaped token detection.

use std::sync::LazyLock;

use regex::Regex;

/// `local-part@domain.tld`, matched anywhere inside a field.
const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

/// Returns true if `field` contains an email-shaped substring.
///
/// This is containment, not validation: `"mail me at a@b.io today"` matches.
pub fn contains_email(field: &str) -> bool {
    EMAIL_RE.is_match(field)
}
