//! Unverified JWT inspection
//!
//! The client never validates signatures; it only peeks at `exp` to decide
//! how long the stored access token has left.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::time::Duration;

/// Decode the payload segment of a JWT without verifying it
pub fn decode_claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    if payload.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry (`exp` claim) as seconds since the Unix epoch
pub fn expires_at(token: &str) -> Option<u64> {
    decode_claims(token)?.get("exp")?.as_u64()
}

/// Whether the token is expired at `now` (seconds since the epoch)
///
/// Tokens that cannot be decoded or carry no `exp` count as expired.
pub fn is_expired_at(token: &str, now: u64) -> bool {
    expires_at(token).is_none_or(|exp| exp < now)
}

/// Whether the token is expired now
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_millis() / 1000)
}

/// Time left before the token expires, zero when expired or undecodable
pub fn time_remaining(token: &str) -> Duration {
    time_remaining_at(token, now_millis())
}

fn time_remaining_at(token: &str, now_ms: u64) -> Duration {
    expires_at(token).map_or(Duration::ZERO, |exp| {
        Duration::from_millis(exp.saturating_mul(1000).saturating_sub(now_ms))
    })
}

/// Human-readable rendering of a remaining duration
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if duration.is_zero() {
        return "Expired".to_string();
    }

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let (value, unit) = if days > 0 {
        (days, "day")
    } else if hours > 0 {
        (hours, "hour")
    } else if minutes > 0 {
        (minutes, "minute")
    } else {
        (seconds, "second")
    };

    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(target_arch = "wasm32")]
fn now_millis() -> u64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let now = js_sys::Date::now() as u64;
    now
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn decodes_payload_claims() {
        let token = token_with(&serde_json::json!({"sub": "user-1", "exp": 1_700_000_000}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims["sub"], "user-1");
        assert_eq!(expires_at(&token), Some(1_700_000_000));
    }

    #[test]
    fn malformed_tokens_have_no_claims() {
        assert!(decode_claims("").is_none());
        assert!(decode_claims("only-one-part").is_none());
        assert!(decode_claims("a..c").is_none());
        assert!(decode_claims("a.!!!.c").is_none());
    }

    #[test]
    fn expiry_checks() {
        let token = token_with(&serde_json::json!({"exp": 1_000}));
        assert!(!is_expired_at(&token, 999));
        assert!(!is_expired_at(&token, 1_000));
        assert!(is_expired_at(&token, 1_001));

        let no_exp = token_with(&serde_json::json!({"sub": "x"}));
        assert!(is_expired_at(&no_exp, 0));
        assert!(is_expired("garbage"));
    }

    #[test]
    fn remaining_time_saturates_at_zero() {
        let token = token_with(&serde_json::json!({"exp": 100}));
        assert_eq!(time_remaining_at(&token, 40_000), Duration::from_secs(60));
        assert_eq!(time_remaining_at(&token, 200_000), Duration::ZERO);
        assert_eq!(time_remaining("garbage"), Duration::ZERO);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::ZERO), "Expired");
        assert_eq!(format_duration(Duration::from_secs(1)), "1 second");
        assert_eq!(format_duration(Duration::from_secs(45)), "45 seconds");
        assert_eq!(format_duration(Duration::from_secs(60)), "1 minute");
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2 hours");
        assert_eq!(format_duration(Duration::from_secs(86_400 * 3)), "3 days");
    }
}
