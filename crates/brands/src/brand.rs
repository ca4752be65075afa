use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustmark_auth::PrincipalId;
use trustmark_core::{BrandSlug, DomainError, DomainResult, Entity, Revisioned};

/// A brand ("manufacturer"), keyed by the slug of its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub slug: BrandSlug,
    pub name: String,
    pub owner: PrincipalId,
    pub verified: bool,
    pub verified_by: Option<PrincipalId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl Brand {
    /// A new, unverified brand.
    pub fn register(name: &str, owner: PrincipalId, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name required"));
        }
        Ok(Self {
            slug: BrandSlug::from_name(name),
            name: name.to_string(),
            owner,
            verified: false,
            verified_by: None,
            verified_at: None,
            created_at: now,
            revision: 0,
        })
    }

    /// Mark verified. Re-verifying refreshes the verifier and timestamp.
    pub fn verify(&mut self, by: &PrincipalId, now: DateTime<Utc>) {
        self.verified = true;
        self.verified_by = Some(by.clone());
        self.verified_at = Some(now);
    }

    /// Administrative reversal of [`Brand::verify`]. Never used by moderation.
    pub fn unverify(&mut self) {
        self.verified = false;
        self.verified_by = None;
        self.verified_at = None;
    }
}

impl Entity for Brand {
    type Id = BrandSlug;
    const KIND: &'static str = "brand";

    fn id(&self) -> &Self::Id {
        &self.slug
    }
}

impl Revisioned for Brand {
    fn revision(&self) -> u64 {
        self.revision
    }
}
