use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustmark_auth::PrincipalId;
use trustmark_core::{
    BatchId, BrandSlug, DomainError, DomainResult, Entity, ExpectedRevision, ProductId, Revisioned,
};

use crate::serial::{self, Edition};

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

/// Upper bound on editions per creation request.
pub const MAX_EDITIONS: u32 = 500;

/// Product lifecycle.
///
/// Only `purchase` is driven by the ledger; `claimed` and `revoked` are set by
/// external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductState {
    Created,
    Purchased,
    Claimed,
    Revoked,
}

impl ProductState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductState::Created => "created",
            ProductState::Purchased => "purchased",
            ProductState::Claimed => "claimed",
            ProductState::Revoked => "revoked",
        }
    }

    /// State after a successful purchase. Revoked records are out of
    /// circulation.
    pub fn purchase(self) -> DomainResult<ProductState> {
        match self {
            ProductState::Created | ProductState::Purchased | ProductState::Claimed => {
                Ok(ProductState::Purchased)
            }
            ProductState::Revoked => Err(DomainError::conflict("product revoked")),
        }
    }
}

impl core::fmt::Display for ProductState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ProductState::Created),
            "purchased" => Ok(ProductState::Purchased),
            "claimed" => Ok(ProductState::Claimed),
            "revoked" => Ok(ProductState::Revoked),
            other => Err(DomainError::validation(format!("unknown product state '{other}'"))),
        }
    }
}

/// Descriptive metadata; its encoding is what the content fingerprint covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMetadata {
    pub name: String,
    /// `YYYY-MM-DD`.
    pub manufactured_at: String,
    pub serial: String,
    #[serde(default)]
    pub certificates: Vec<String>,
    #[serde(default)]
    pub image: String,
    pub version: u32,
}

/// Input for creating one product record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    /// Pre-supplied id; allocated when absent.
    pub id: Option<ProductId>,
    pub name: String,
    pub sku: Option<String>,
    pub manufactured_at: Option<String>,
    pub image: Option<String>,
    pub certificates: Vec<String>,
    pub batch_id: Option<BatchId>,
    pub brand_slug: Option<BrandSlug>,
    pub edition: Edition,
    pub creator: PrincipalId,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, creator: PrincipalId) -> Self {
        Self {
            id: None,
            name: name.into(),
            sku: None,
            manufactured_at: None,
            image: None,
            certificates: Vec::new(),
            batch_id: None,
            brand_slug: None,
            edition: Edition::SINGLE,
            creator,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name required"));
        }
        if let Some(date) = self.manufactured_at.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                DomainError::validation(format!("manufacturedAt must be YYYY-MM-DD, got '{date}'"))
            })?;
        }
        Ok(())
    }

    /// One draft per edition of a request for `count` copies.
    pub fn editions(&self, count: i64) -> DomainResult<Vec<ProductDraft>> {
        if count > i64::from(MAX_EDITIONS) {
            return Err(DomainError::validation(format!(
                "editionCount must be at most {MAX_EDITIONS}"
            )));
        }
        Ok(Edition::series(count)
            .into_iter()
            .map(|edition| ProductDraft {
                id: None,
                edition,
                ..self.clone()
            })
            .collect())
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Stored product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub token_id: ProductId,
    pub brand_slug: Option<BrandSlug>,
    pub meta: ProductMetadata,
    /// Content fingerprint (truncated digest of the encoded metadata).
    pub ipfs_hash: String,
    pub serial_hash: String,
    pub state: ProductState,
    pub created_at: DateTime<Utc>,
    pub public_url: String,
    pub owner: PrincipalId,
    pub seller: PrincipalId,
    pub edition_no: u32,
    pub edition_total: u32,
    pub sku: Option<String>,
    pub batch_id: Option<BatchId>,
    /// Store revision; bumped on every write.
    #[serde(default)]
    pub revision: u64,
}

/// Public details URL of a product.
pub fn public_url(public_base: &str, id: ProductId) -> String {
    format!("{}/details.html?id={id}", public_base.trim_end_matches('/'))
}

impl Product {
    /// Build the full record for a freshly allocated id. Fingerprints are
    /// computed here and never recomputed.
    pub fn mint(
        id: ProductId,
        draft: &ProductDraft,
        now: DateTime<Utc>,
        public_base: &str,
    ) -> DomainResult<Product> {
        draft.validate()?;

        let name = draft.name.trim().to_string();
        let serial = serial::serial(&name, draft.edition, now);
        let meta = ProductMetadata {
            name,
            manufactured_at: trimmed(draft.manufactured_at.as_deref())
                .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
            serial,
            certificates: draft
                .certificates
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            image: trimmed(draft.image.as_deref()).unwrap_or_default(),
            version: METADATA_VERSION,
        };
        let encoded = serde_json::to_vec(&meta)
            .map_err(|e| DomainError::validation(format!("metadata not encodable: {e}")))?;

        Ok(Product {
            token_id: id,
            brand_slug: draft.brand_slug.clone(),
            ipfs_hash: serial::content_fingerprint(&encoded),
            serial_hash: serial::serial_fingerprint(&meta.serial),
            meta,
            state: ProductState::Created,
            created_at: now,
            public_url: public_url(public_base, id),
            owner: draft.creator.clone(),
            seller: draft.creator.clone(),
            edition_no: draft.edition.number(),
            edition_total: draft.edition.total(),
            sku: trimmed(draft.sku.as_deref()).map(|s| s.to_uppercase()),
            batch_id: draft.batch_id.clone(),
            revision: 0,
        })
    }

    pub fn is_owned_by(&self, principal: &PrincipalId) -> bool {
        self.owner == *principal
    }

    /// Decide a purchase by `buyer`. Pure: the returned transfer is applied
    /// atomically by the store, conditioned on this record's revision.
    pub fn purchase(&self, buyer: &PrincipalId, now: DateTime<Utc>) -> DomainResult<OwnershipTransfer> {
        if self.is_owned_by(buyer) {
            return Err(DomainError::conflict("already owned by you"));
        }
        Ok(OwnershipTransfer {
            product_id: self.token_id,
            from: self.owner.clone(),
            to: buyer.clone(),
            state: self.state.purchase()?,
            at: now,
            expected: self.expected(),
        })
    }

    pub fn apply_transfer(&mut self, transfer: &OwnershipTransfer) {
        self.owner = transfer.to.clone();
        self.state = transfer.state;
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> &Self::Id {
        &self.token_id
    }
}

impl Revisioned for Product {
    fn revision(&self) -> u64 {
        self.revision
    }
}

/// A decided change of ownership, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTransfer {
    pub product_id: ProductId,
    pub from: PrincipalId,
    pub to: PrincipalId,
    pub state: ProductState,
    pub at: DateTime<Utc>,
    /// The product revision the decision was made against.
    pub expected: ExpectedRevision,
}
