//! Injected identity policy (administrator and manufacturer allow-lists).

use std::collections::HashSet;
use std::sync::Arc;

use crate::{PrincipalId, Role};

/// Read-only capability answering "which roles does this principal hold".
///
/// Built once at startup and passed into every component that needs it; tests
/// substitute fixtures instead of mutating process-wide state.
pub trait IdentityPolicy: Send + Sync {
    fn is_admin(&self, principal: &PrincipalId) -> bool;

    fn is_manufacturer(&self, principal: &PrincipalId) -> bool;

    /// Roles granted to the principal, in a stable order.
    fn roles(&self, principal: &PrincipalId) -> Vec<Role> {
        let mut roles = Vec::new();
        if self.is_admin(principal) {
            roles.push(Role::ADMIN);
        }
        if self.is_manufacturer(principal) {
            roles.push(Role::MANUFACTURER);
        }
        roles
    }
}

impl<P> IdentityPolicy for Arc<P>
where
    P: IdentityPolicy + ?Sized,
{
    fn is_admin(&self, principal: &PrincipalId) -> bool {
        (**self).is_admin(principal)
    }

    fn is_manufacturer(&self, principal: &PrincipalId) -> bool {
        (**self).is_manufacturer(principal)
    }
}

/// Allow-list policy loaded from configuration (and the persisted admin roster).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentityPolicy {
    admins: HashSet<PrincipalId>,
    manufacturers: HashSet<PrincipalId>,
}

impl StaticIdentityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = PrincipalId>) -> Self {
        self.admins.extend(admins);
        self
    }

    pub fn with_manufacturers(mut self, manufacturers: impl IntoIterator<Item = PrincipalId>) -> Self {
        self.manufacturers.extend(manufacturers);
        self
    }

    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }
}

impl IdentityPolicy for StaticIdentityPolicy {
    fn is_admin(&self, principal: &PrincipalId) -> bool {
        self.admins.contains(principal)
    }

    fn is_manufacturer(&self, principal: &PrincipalId) -> bool {
        self.manufacturers.contains(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    #[test]
    fn allow_lists_are_case_insensitive_through_normalization() {
        let policy = StaticIdentityPolicy::new()
            .with_admins([p("Root@Example.com")])
            .with_manufacturers([p("maker@example.com")]);

        assert!(policy.is_admin(&p("root@example.com")));
        assert!(!policy.is_admin(&p("maker@example.com")));
        assert!(policy.is_manufacturer(&p("MAKER@example.com")));
        assert_eq!(policy.roles(&p("root@example.com")), vec![Role::ADMIN]);
        assert!(policy.roles(&p("nobody@example.com")).is_empty());
    }

    #[test]
    fn shared_policy_delegates() {
        let policy: Arc<dyn IdentityPolicy> =
            Arc::new(StaticIdentityPolicy::new().with_admins([p("a@x.io")]));
        assert!(policy.is_admin(&p("a@x.io")));
    }
}
