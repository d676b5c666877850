//! Evaluation of the conditional request headers.
//!
//! Each validator is a pure function over the header value and the current
//! state of the file: its strong entity tag or its modification time.

use chrono::{DateTime, SubsecRound, Utc};
use md5::{Digest, Md5};

/// Format of `Last-Modified` and the other HTTP dates (RFC 1123, always GMT).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Computes the strong entity tag of a file's contents: the lowercase hex
/// MD5 digest, without quotes.
pub fn compute_etag(contents: &[u8]) -> String {
    hex::encode(Md5::digest(contents))
}

/// `If-Match`: true when the criteria name the file's current entity tag.
///
/// `*` matches any file. Weak tags (`W/"..."`) never match, since
/// `If-Match` requires strong comparison.
pub fn if_match(criteria: &str, etag: &str) -> bool {
    if criteria.trim() == "*" {
        return true;
    }

    criteria
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.starts_with("W/"))
        .any(|tag| tag.replace('"', "") == etag)
}

/// `If-None-Match`: true when none of the criteria name the file's current
/// entity tag, i.e. the client's copy is stale and the file must be sent.
///
/// `*` never passes. Comparison is weak, so a `W/` prefix is ignored.
pub fn if_none_match(criteria: &str, etag: &str) -> bool {
    if criteria.trim() == "*" {
        return false;
    }

    !criteria
        .split(',')
        .map(str::trim)
        .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
        .any(|tag| tag.replace('"', "") == etag)
}

/// `If-Modified-Since`: true when the file changed strictly after the given
/// date.
///
/// The file time is truncated to whole seconds first, the precision of the
/// `Last-Modified` header a client echoes back.
pub fn if_modified_since(
    criteria: &str,
    last_modified: DateTime<Utc>,
) -> Result<bool, chrono::ParseError> {
    let since = parse_http_date(criteria)?;
    Ok(last_modified.trunc_subsecs(0) > since)
}

pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc2822(value.trim()).map(|date| date.with_timezone(&Utc))
}

pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format(HTTP_DATE_FORMAT).to_string()
}
