//! Reads the `exp` claim out of an access token without verifying it.
//! The gateway is the only party that validates signatures.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Expiry encoded in a JWT access token, or `None` for opaque tokens
pub fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    // Some issuers pad their segments anyway
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

#[cfg(test)]
pub(crate) fn encode_test_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"tester","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_exp_claim() {
        let token = encode_test_token(1_700_000_000);
        assert_eq!(
            expiry(&token),
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        assert_eq!(expiry("opaque-access-token"), None);
        assert_eq!(expiry("a.b"), None);
        assert_eq!(expiry("a.b.c.d"), None);
        assert_eq!(expiry("header.!!!.sig"), None);
    }

    #[test]
    fn test_token_without_exp_claim() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"tester"}"#);
        assert_eq!(expiry(&format!("h.{}.s", payload)), None);
    }
}
