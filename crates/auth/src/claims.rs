use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalId;

/// Identity claims handed over by the external identity provider.
///
/// Signature verification / decoding is done by the provider; the ledger only
/// checks the time window and extracts the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    /// Verified e-mail address of the subject.
    pub email: Option<String>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token carries no usable identity")]
    MissingIdentity,
}

/// Deterministically validate claims and resolve the principal they carry.
pub fn validate_claims(
    claims: &IdentityClaims,
    now: DateTime<Utc>,
) -> Result<PrincipalId, TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    claims
        .email
        .as_deref()
        .and_then(|e| PrincipalId::parse(e).ok())
        .ok_or(TokenValidationError::MissingIdentity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(email: Option<&str>, issued: DateTime<Utc>, ttl_minutes: i64) -> IdentityClaims {
        IdentityClaims {
            email: email.map(str::to_string),
            issued_at: issued,
            expires_at: issued + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn valid_claims_yield_normalized_principal() {
        let now = Utc::now();
        let c = claims(Some(" Buyer@Example.com "), now - Duration::minutes(1), 10);
        assert_eq!(validate_claims(&c, now).unwrap().as_str(), "buyer@example.com");
    }

    #[test]
    fn time_window_is_enforced() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims(Some("a@x.io"), now - Duration::minutes(20), 10), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims(Some("a@x.io"), now + Duration::minutes(5), 10), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims(Some("a@x.io"), now, 0), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn missing_email_is_rejected() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims(None, now - Duration::minutes(1), 10), now),
            Err(TokenValidationError::MissingIdentity)
        );
        assert_eq!(
            validate_claims(&claims(Some("  "), now - Duration::minutes(1), 10), now),
            Err(TokenValidationError::MissingIdentity)
        );
    }
}
