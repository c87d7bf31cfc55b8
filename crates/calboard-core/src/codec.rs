//! Stateless encoders shared by the signer, token cache and event fetcher.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};

/// Base64 with the URL-safe alphabet (`-`, `_`) and no `=` padding.
pub fn base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Percent-encode every byte outside `[A-Za-z0-9-._~]` as uppercase `%XX`.
///
/// Used for query parameters, path segments and form bodies alike, so a
/// space becomes `%20` rather than `+`.
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Format an instant as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn to_iso8601(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Format `instant + days` as `YYYY-MM-DDTHH:MM:SSZ`, saturating at the
/// largest representable instant.
pub fn iso8601_after_days(instant: DateTime<Utc>, days: u32) -> String {
    let end = Duration::try_days(i64::from(days))
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    to_iso8601(end)
}
