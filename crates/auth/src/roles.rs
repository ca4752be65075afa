use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier resolved for a principal by the identity policy.
///
/// Roles are opaque strings; the ledger itself only distinguishes
/// [`Role::ADMIN`] and [`Role::MANUFACTURER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Moderates applications, verifies brands, sees full product views.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    /// May register brands for itself.
    pub const MANUFACTURER: Role = Role(Cow::Borrowed("manufacturer"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
