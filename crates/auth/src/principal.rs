use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustmark_core::{DomainError, Entity};

/// Identity of an authenticated principal (normally a verified e-mail address).
///
/// Always stored trimmed and lower-cased, so equality is the case-insensitive
/// identity comparison the ledger needs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::invalid_id("principal: empty identity"));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid_id("principal: contains whitespace"));
        }
        Ok(Self(normalized))
    }

    /// Parse an optional, possibly blank identity (anonymous requesters).
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>, DomainError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw identity string.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PrincipalId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PrincipalId> for String {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

/// Entry of the persisted administrator roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    pub principal: PrincipalId,
    /// Who granted the role; `None` for bootstrap and configured defaults.
    pub granted_by: Option<PrincipalId>,
    pub created_at: DateTime<Utc>,
}

impl AdminRecord {
    pub fn new(principal: PrincipalId, granted_by: Option<PrincipalId>, created_at: DateTime<Utc>) -> Self {
        Self {
            principal,
            granted_by,
            created_at,
        }
    }
}

impl Entity for AdminRecord {
    type Id = PrincipalId;
    const KIND: &'static str = "admin";

    fn id(&self) -> &Self::Id {
        &self.principal
    }
}
