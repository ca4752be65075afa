use thiserror::Error;

use trustmark_core::DomainError;

use crate::{IdentityPolicy, PrincipalId, Role};

/// A fully resolved requester for authorization and visibility decisions.
///
/// Anonymous requesters have no principal and no roles. Construction is
/// decoupled from storage and transport: callers resolve the principal from
/// claims, then ask the injected policy for roles once per request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requester {
    principal: Option<PrincipalId>,
    roles: Vec<Role>,
}

impl Requester {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn resolve(principal: Option<PrincipalId>, policy: &dyn IdentityPolicy) -> Self {
        let roles = principal
            .as_ref()
            .map(|p| policy.roles(p))
            .unwrap_or_default();
        Self { principal, roles }
    }

    /// Build a requester with explicit roles (fixtures, operator tooling).
    pub fn with_roles(principal: PrincipalId, roles: Vec<Role>) -> Self {
        Self {
            principal: Some(principal),
            roles,
        }
    }

    pub fn principal(&self) -> Option<&PrincipalId> {
        self.principal.as_ref()
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::ADMIN)
    }

    /// True when the requester is authenticated and is `principal`.
    pub fn is(&self, principal: &PrincipalId) -> bool {
        self.principal.as_ref() == Some(principal)
    }

    pub fn require_authenticated(&self) -> Result<&PrincipalId, AuthzError> {
        self.principal.as_ref().ok_or(AuthzError::Unauthenticated)
    }

    pub fn require_admin(&self) -> Result<&PrincipalId, AuthzError> {
        authorize(self, &Role::ADMIN)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("missing user")]
    Unauthenticated,

    #[error("forbidden: missing role '{0}'")]
    Forbidden(String),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated => DomainError::Unauthenticated,
            AuthzError::Forbidden(role) => DomainError::forbidden(format!("requires role '{role}'")),
        }
    }
}

/// Authorize a requester for a role.
///
/// - No IO
/// - No panics
/// - Pure policy check over already-resolved roles
pub fn authorize<'a>(requester: &'a Requester, required: &Role) -> Result<&'a PrincipalId, AuthzError> {
    let principal = requester.require_authenticated()?;
    if requester.has_role(required) {
        Ok(principal)
    } else {
        tracing::debug!(principal = %principal, role = %required, "authorization denied");
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticIdentityPolicy;

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    fn policy() -> StaticIdentityPolicy {
        StaticIdentityPolicy::new()
            .with_admins([p("admin@x.io")])
            .with_manufacturers([p("maker@x.io")])
    }

    #[test]
    fn anonymous_requesters_are_unauthenticated() {
        let r = Requester::resolve(None, &policy());
        assert_eq!(r.require_authenticated(), Err(AuthzError::Unauthenticated));
        assert_eq!(r.require_admin(), Err(AuthzError::Unauthenticated));
        assert!(!r.is_admin());
    }

    #[test]
    fn admin_role_is_resolved_from_policy() {
        let r = Requester::resolve(Some(p("admin@x.io")), &policy());
        assert!(r.is_admin());
        assert_eq!(r.require_admin().unwrap().as_str(), "admin@x.io");
    }

    #[test]
    fn non_admins_are_forbidden() {
        let r = Requester::resolve(Some(p("maker@x.io")), &policy());
        assert!(r.has_role(&Role::MANUFACTURER));
        assert_eq!(r.require_admin(), Err(AuthzError::Forbidden("admin".to_string())));
        let err: DomainError = r.require_admin().unwrap_err().into();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
