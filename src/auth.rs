use axum::extract::Query;
use axum::http::Uri;
use tracing::warn;

/// The first `token` query parameter, or an empty string when absent or
/// unparsable. Later duplicates are ignored.
pub fn extract_token(uri: &Uri) -> String {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(pairs)| {
            pairs
                .into_iter()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value)
        })
        .unwrap_or_default()
}

/// Length in UTF-16 code units, the unit reported for tokens in logs and
/// the health response.
pub fn js_length(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Check a caller-supplied token against the configured secret.
///
/// An unset secret rejects everything, including an empty token.
/// Only the lengths are logged on failure.
pub fn verify(provided: &str, expected: &str) -> bool {
    if !expected.is_empty() && timing_safe_eq(provided, expected) {
        return true;
    }
    warn!(
        "Bad token (received_len={}, expected_len={})",
        js_length(provided),
        js_length(expected)
    );
    false
}

fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
