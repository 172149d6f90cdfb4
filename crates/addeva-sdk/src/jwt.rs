//! JWT payload inspection.
//!
//! Only the claims segment of a token is decoded, to read its `exp`
//! claim before a request is sent.  Signatures are never checked; the
//! server remains the authority on whether a token is valid.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{Map, Value};

/// Default clock-skew allowance, in seconds.
pub const DEFAULT_SKEW_SECS: i64 = 30;

/// Decode the claims (middle) segment of a JWT.
///
/// Returns `None` unless the token has exactly three `.`-separated parts
/// and the middle one is base64url-encoded UTF-8 JSON describing an
/// object.  Standard-alphabet characters and `=` padding are tolerated.
pub fn decode_payload(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.split('.');
    let (Some(_header), Some(body), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let normalised: String = body
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD.decode(normalised).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// The numeric `exp` claim, in seconds since the Unix epoch.
///
/// A missing, non-numeric or zero `exp` yields `None`.
pub fn expiry(token: &str) -> Option<f64> {
    decode_payload(token)?
        .get("exp")
        .and_then(Value::as_f64)
        .filter(|exp| *exp != 0.0)
}

/// Whether `token` counts as expired at `now_secs`.
///
/// A token is expired once `now_secs >= exp - skew_secs`.  Tokens without
/// a decodable expiry are never reported as expired.
#[allow(clippy::cast_precision_loss)]
pub fn is_expired_at(token: &str, skew_secs: i64, now_secs: i64) -> bool {
    match expiry(token) {
        Some(exp) => now_secs as f64 >= exp - skew_secs as f64,
        None => false,
    }
}

/// Whether `token` counts as expired right now.
pub fn is_expired(token: &str, skew_secs: i64) -> bool {
    is_expired_at(token, skew_secs, chrono::Utc::now().timestamp())
}
