//! Requester-scoped verification view.

use serde::{Deserialize, Serialize};

use trustmark_auth::Requester;
use trustmark_core::{BatchId, BrandSlug, ProductId};

use crate::product::{Product, ProductMetadata, ProductState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationScope {
    /// Owner or administrator: everything, serial included.
    Full,
    /// Anyone else: serial redacted.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationView {
    pub state: ProductState,
    pub token_id: ProductId,
    pub brand_slug: Option<BrandSlug>,
    pub metadata: ProductMetadata,
    pub public_url: String,
    pub edition_no: u32,
    pub edition_total: u32,
    pub scope: VerificationScope,
    pub can_acquire: bool,
    pub sku: Option<String>,
    pub batch_id: Option<BatchId>,
}

/// Project `product` for `requester`.
pub fn project(product: &Product, requester: &Requester) -> VerificationView {
    let is_owner = requester.is(&product.owner);
    let scope = if is_owner || requester.is_admin() {
        VerificationScope::Full
    } else {
        VerificationScope::Public
    };

    let mut metadata = product.meta.clone();
    if scope == VerificationScope::Public {
        metadata.serial.clear();
    }

    VerificationView {
        state: product.state,
        token_id: product.token_id,
        brand_slug: product.brand_slug.clone(),
        metadata,
        public_url: product.public_url.clone(),
        edition_no: product.edition_no,
        edition_total: product.edition_total,
        scope,
        can_acquire: requester.principal().is_some() && !is_owner,
        sku: product.sku.clone(),
        batch_id: product.batch_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trustmark_auth::{PrincipalId, Role};

    use crate::ProductDraft;

    fn principal(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    fn product() -> Product {
        let draft = ProductDraft::new("Aurora Watch", principal("owner@x.io"));
        Product::mint(ProductId::new(1).unwrap(), &draft, Utc::now(), "").unwrap()
    }

    #[test]
    fn owner_sees_everything_but_cannot_acquire() {
        let p = product();
        let view = project(&p, &Requester::with_roles(principal("owner@x.io"), vec![]));
        assert_eq!(view.scope, VerificationScope::Full);
        assert_eq!(view.metadata.serial, p.meta.serial);
        assert!(!view.can_acquire);
    }

    #[test]
    fn admin_sees_serial_and_can_acquire() {
        let p = product();
        let view = project(&p, &Requester::with_roles(principal("root@x.io"), vec![Role::ADMIN]));
        assert_eq!(view.scope, VerificationScope::Full);
        assert!(!view.metadata.serial.is_empty());
        assert!(view.can_acquire);
    }

    #[test]
    fn anonymous_sees_public_view() {
        let p = product();
        let view = project(&p, &Requester::anonymous());
        assert_eq!(view.scope, VerificationScope::Public);
        assert!(view.metadata.serial.is_empty());
        assert_eq!(view.metadata.name, p.meta.name);
        assert_eq!(view.metadata.manufactured_at, p.meta.manufactured_at);
        assert!(!view.can_acquire);
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let view = project(&product(), &Requester::anonymous());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["scope"], "public");
        assert_eq!(json["canAcquire"], false);
        assert_eq!(json["tokenId"], 1);
        assert_eq!(json["metadata"]["serial"], "");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Serial survives only for owner/admin; canAcquire is false only
            /// for anonymous requesters and the owner.
            #[test]
            fn redaction_follows_identity(
                who in proptest::option::of("(owner|other|root)@x\\.io"),
                admin in any::<bool>()
            ) {
                let p = product();
                let requester = match &who {
                    None => Requester::anonymous(),
                    Some(raw) => {
                        let roles = if admin { vec![Role::ADMIN] } else { vec![] };
                        Requester::with_roles(principal(raw), roles)
                    }
                };
                let view = project(&p, &requester);

                let is_owner = who.as_deref() == Some("owner@x.io");
                let privileged = is_owner || (who.is_some() && admin);
                prop_assert_eq!(view.metadata.serial.is_empty(), !privileged);
                prop_assert_eq!(view.can_acquire, who.is_some() && !is_owner);
                prop_assert_eq!(&view.metadata.certificates, &p.meta.certificates);
            }
        }
    }
}
