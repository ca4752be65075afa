use chrono::{DateTime, Utc};

use trustmark_auth::{IdentityClaims, PrincipalId, validate_claims};
use trustmark_infra::LedgerError;

/// Resolve the principal of a request from the claims the identity provider
/// handed over. No claims means an anonymous request.
pub fn principal_from_claims(
    claims: Option<&IdentityClaims>,
    now: DateTime<Utc>,
) -> Result<Option<PrincipalId>, LedgerError> {
    match claims {
        None => Ok(None),
        Some(claims) => validate_claims(claims, now).map(Some).map_err(|e| {
            tracing::debug!(error = %e, "identity claims rejected");
            LedgerError::Unauthenticated
        }),
    }
}
