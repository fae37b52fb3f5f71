//! Bearer token decoding
//!
//! The client never holds the signing key, so tokens are decoded without
//! signature verification. The only thing read from them is the expiry; the
//! API remains the authority on whether a token is actually valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Claims the client cares about
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Expiration time, seconds since epoch
    pub exp: i64,
    /// Subject (user ID), numeric or string depending on the issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.exp, 0)
            .ok_or_else(|| Error::Decode(format!("exp out of range: {}", self.exp)))
    }
}

/// Decode the claim set of a token without checking its signature.
///
/// Works for any signing algorithm named in the header.
pub fn decode_claims(token: &str) -> Result<Claims> {
    jsonwebtoken::dangerous::insecure_decode::<Claims>(token)
        .map(|data| data.claims)
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Extract the expiry claim of a token
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>> {
    decode_claims(token)?.expires_at()
}

/// Whether the token is expired at `now`. Undecodable tokens count as expired.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_expiry(token) {
        Ok(expiry) => now >= expiry,
        Err(e) => {
            tracing::debug!("Treating undecodable token as expired: {}", e);
            true
        }
    }
}

#[cfg(test)]
pub(crate) fn test_token(exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        exp,
        sub: Some(serde_json::json!(1)),
        role: Some("customer".to_string()),
        iat: Some(exp - 3600),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"issuer-only-secret"),
    )
    .expect("Failed to create token")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_decode_expiry() {
        let exp = Utc::now().timestamp() + 3600;
        let token = test_token(exp);
        let expiry = decode_expiry(&token).expect("Failed to decode token");
        assert_eq!(expiry.timestamp(), exp);
    }

    #[test]
    fn test_fresh_token_not_expired() {
        let token = test_token(Utc::now().timestamp() + 3600);
        assert!(!is_expired(&token, Utc::now()));
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let exp = Utc::now().timestamp() + 60;
        let token = test_token(exp);
        let at_expiry = DateTime::<Utc>::from_timestamp(exp, 0).unwrap();
        assert!(is_expired(&token, at_expiry));
        assert!(!is_expired(&token, at_expiry - Duration::seconds(1)));
    }

    #[test]
    fn test_past_token_expired() {
        let token = test_token(Utc::now().timestamp() - 1);
        assert!(is_expired(&token, Utc::now()));
    }

    #[test]
    fn test_malformed_token() {
        assert!(decode_expiry("not-a-jwt-token").is_err());
        assert!(is_expired("not-a-jwt-token", Utc::now()));
        assert!(is_expired("", Utc::now()));
    }

    #[test]
    fn test_signature_not_checked() {
        let token = test_token(Utc::now().timestamp() + 3600);
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        let tampered = format!("{}.c2lnbmF0dXJl", unsigned);
        assert!(decode_expiry(&tampered).is_ok());
    }

    // header.payload.signature with the signature left as an arbitrary blob
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";
    const ES256_HEADER: &str = "eyJhbGciOiJFUzI1NiIsInR5cCI6IkpXVCJ9";
    // {"exp":4102444800,"sub":"u-1","role":"provider"}
    const FAR_FUTURE_PAYLOAD: &str = "eyJleHAiOjQxMDI0NDQ4MDAsInN1YiI6InUtMSIsInJvbGUiOiJwcm92aWRlciJ9";
    // {"exp":1000000000}
    const PAST_PAYLOAD: &str = "eyJleHAiOjEwMDAwMDAwMDB9";

    #[test]
    fn test_asymmetric_algorithms_decode() {
        for header in [RS256_HEADER, ES256_HEADER] {
            let token = format!("{}.{}.c2lnbmF0dXJl", header, FAR_FUTURE_PAYLOAD);
            let expiry = decode_expiry(&token).expect("asymmetric token should decode");
            assert_eq!(expiry.timestamp(), 4_102_444_800);
            assert!(!is_expired(&token, Utc::now()));
            assert_eq!(decode_claims(&token).unwrap().role.as_deref(), Some("provider"));

            let stale = format!("{}.{}.c2lnbmF0dXJl", header, PAST_PAYLOAD);
            assert!(is_expired(&stale, Utc::now()));
        }
    }

    #[test]
    fn test_claims_carry_role() {
        let token = test_token(Utc::now().timestamp() + 3600);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("customer"));
        assert_eq!(claims.sub, Some(serde_json::json!(1)));
    }
}
