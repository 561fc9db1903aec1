//! Canonical string construction.
//!
//! Signer and verifier must derive byte-identical input for the keyed hash.
//! The canonical string is the newline-joined, lowercased concatenation of:
//!
//! ```text
//! RFC1123-Date\n
//! Body\n
//! Method\n
//! Path\n
//! Nonce\n
//! Query (without leading '?')
//! ```
//!
//! A missing query contributes an empty final segment. Lowercasing the whole
//! string means method and date casing never cause a mismatch.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{HmacAuthError, HmacAuthResult};

/// RFC 1123 date layout. Always UTC, always English names.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an RFC 1123 HTTP date.
///
/// Sub-second precision is dropped.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hmac_auth::canonical::format_http_date;
///
/// let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(format_http_date(date), "Mon, 01 Jan 2024 00:00:00 GMT");
/// ```
#[must_use]
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an RFC 1123 HTTP date. Returns `None` unless `value` is exactly what
/// [`format_http_date`] would produce for the parsed instant.
///
/// # Examples
///
/// ```
/// use hmac_auth::canonical::{format_http_date, parse_http_date};
///
/// let date = parse_http_date("Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
/// assert_eq!(format_http_date(date), "Mon, 01 Jan 2024 00:00:00 GMT");
/// assert!(parse_http_date("2024-01-01T00:00:00Z").is_none());
/// ```
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDateTime::parse_from_str(value, HTTP_DATE_FORMAT)
        .ok()?
        .and_utc();

    // chrono tolerates padding, spacing and case variants; only the exact
    // formatted text is accepted.
    (format_http_date(date) == value).then_some(date)
}

/// Build the canonical string for a request.
///
/// # Errors
///
/// Returns [`HmacAuthError::InvalidArgument`] if `date` is the default
/// timestamp (the Unix epoch), which indicates the caller never set it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hmac_auth::canonical::build_canonical_string;
///
/// let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let canonical =
///     build_canonical_string(date, "", "GET", "/orders", Some("?page=2"), "abc123").unwrap();
/// assert_eq!(canonical, "mon, 01 jan 2024 00:00:00 gmt\n\nget\n/orders\nabc123\npage=2");
/// ```
pub fn build_canonical_string(
    date: DateTime<Utc>,
    body: &str,
    method: &str,
    path: &str,
    query: Option<&str>,
    nonce: &str,
) -> HmacAuthResult<String> {
    if date == DateTime::<Utc>::default() {
        return Err(HmacAuthError::invalid_argument(
            "request date must not be the default timestamp",
        ));
    }

    let date = format_http_date(date);
    let query = query.map_or("", |q| q.trim_start_matches('?'));

    Ok(format!("{date}\n{body}\n{method}\n{path}\n{nonce}\n{query}").to_lowercase())
}
