//! Brand registry: idempotent creation, lookup and verification.

use chrono::Utc;
use tracing::instrument;

use trustmark_auth::PrincipalId;
use trustmark_brands::Brand;
use trustmark_core::{BrandSlug, Entity, Revisioned};

use crate::error::{LedgerResult, MAX_TRANSACTION_ATTEMPTS, retry_on_conflict};
use crate::store::{SharedStore, StoreError};

#[derive(Clone)]
pub struct BrandRegistry {
    store: SharedStore,
}

impl BrandRegistry {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Register `name` for `owner`. Registering a slug that already exists
    /// returns the stored brand unchanged, whoever owns it.
    #[instrument(skip(self), fields(owner = %owner), err)]
    pub async fn create(&self, name: &str, owner: &PrincipalId) -> LedgerResult<Brand> {
        let brand = Brand::register(name, owner.clone(), Utc::now())?;
        match self.store.create_brand(&brand).await {
            Ok(stored) => {
                tracing::info!(slug = %stored.slug, "brand registered");
                Ok(stored)
            }
            Err(StoreError::AlreadyExists(_)) => {
                let existing = self.get(&brand.slug).await?;
                if existing.owner != *owner {
                    tracing::debug!(slug = %existing.slug, holder = %existing.owner, "slug already held");
                }
                Ok(existing)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(slug = %slug), err)]
    pub async fn get(&self, slug: &BrandSlug) -> LedgerResult<Brand> {
        self.store
            .get_brand(slug)
            .await?
            .ok_or_else(|| Brand::not_found().into())
    }

    /// Brands owned by `owner`, oldest first.
    #[instrument(skip(self), fields(owner = %owner), err)]
    pub async fn list_by_owner(&self, owner: &PrincipalId) -> LedgerResult<Vec<Brand>> {
        Ok(self.store.list_brands_by_owner(owner).await?)
    }

    /// The slug stamped on products made by a manufacturer: their first brand.
    pub async fn first_owned_by(&self, owner: &PrincipalId) -> LedgerResult<Option<Brand>> {
        Ok(self.list_by_owner(owner).await?.into_iter().next())
    }

    /// Mark verified by `by`. Repeating it refreshes verifier and timestamp.
    #[instrument(skip(self), fields(slug = %slug, by = %by), err)]
    pub async fn verify(&self, slug: &BrandSlug, by: &PrincipalId) -> LedgerResult<Brand> {
        let brand = retry_on_conflict("verify_brand", MAX_TRANSACTION_ATTEMPTS, move || {
            self.try_set_verified(slug, Some(by))
        })
        .await?;
        tracing::info!(slug = %brand.slug, "brand verified");
        Ok(brand)
    }

    #[instrument(skip(self), fields(slug = %slug), err)]
    pub async fn unverify(&self, slug: &BrandSlug) -> LedgerResult<Brand> {
        let brand = retry_on_conflict("unverify_brand", MAX_TRANSACTION_ATTEMPTS, move || {
            self.try_set_verified(slug, None)
        })
        .await?;
        tracing::info!(slug = %brand.slug, "brand verification withdrawn");
        Ok(brand)
    }

    async fn try_set_verified(&self, slug: &BrandSlug, by: Option<&PrincipalId>) -> LedgerResult<Brand> {
        let mut brand = self.get(slug).await?;
        match by {
            Some(by) => brand.verify(by, Utc::now()),
            None => brand.unverify(),
        }
        Ok(self.store.update_brand(&brand, brand.expected()).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::LedgerError;
    use crate::store::InMemoryLedgerStore;

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    fn registry() -> BrandRegistry {
        BrandRegistry::new(Arc::new(InMemoryLedgerStore::new()))
    }

    #[tokio::test]
    async fn first_writer_keeps_the_slug() {
        let registry = registry();
        let first = registry.create("Aurora Watch", &p("a@example.com")).await.unwrap();
        let second = registry.create("aurora  watch!", &p("b@example.com")).await.unwrap();
        assert_eq!(first.slug.as_str(), "AURORA-WATCH");
        assert_eq!(second, first);
        assert!(registry.list_by_owner(&p("b@example.com")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verify_and_unverify_round_trip() {
        let registry = registry();
        let brand = registry.create("Nordlys", &p("owner@example.com")).await.unwrap();
        assert!(!brand.verified);

        let verified = registry.verify(&brand.slug, &p("admin@example.com")).await.unwrap();
        assert!(verified.verified);
        assert_eq!(verified.verified_by, Some(p("admin@example.com")));

        let again = registry.verify(&brand.slug, &p("other@example.com")).await.unwrap();
        assert_eq!(again.verified_by, Some(p("other@example.com")));

        let cleared = registry.unverify(&brand.slug).await.unwrap();
        assert!(!cleared.verified);
        assert_eq!(cleared.verified_by, None);
    }

    #[tokio::test]
    async fn verifying_unknown_brand_is_not_found() {
        let slug = BrandSlug::from_name("ghost");
        let err = registry().verify(&slug, &p("admin@example.com")).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(ref m) if m == "brand not found"));
    }
}
