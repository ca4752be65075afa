//! Ownership transfer engine.
//!
//! ```text
//! read product ──► decide (pure) ──► commit_transfer (revision-guarded)
//!        ▲                                     │
//!        └────────── contention ───────────────┘
//! ```
//!
//! Only contention is retried: the re-read re-decides against the winner's
//! state, so a buyer who lost to themselves gets "already owned by you".

use chrono::Utc;
use tracing::instrument;

use trustmark_auth::PrincipalId;
use trustmark_core::{Entity, ProductId};
use trustmark_products::{OwnershipHistoryEntry, Product};

use crate::error::{LedgerResult, MAX_TRANSACTION_ATTEMPTS, retry_on_conflict};
use crate::store::SharedStore;

#[derive(Clone)]
pub struct OwnershipTransfers {
    store: SharedStore,
}

impl OwnershipTransfers {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Move `product_id` to `buyer`, marking it purchased.
    #[instrument(skip(self), fields(product_id = %product_id, buyer = %buyer), err)]
    pub async fn purchase(&self, product_id: ProductId, buyer: &PrincipalId) -> LedgerResult<Product> {
        let product = retry_on_conflict("purchase", MAX_TRANSACTION_ATTEMPTS, move || {
            self.try_purchase(product_id, buyer)
        })
        .await?;
        tracing::info!(product_id = %product_id, owner = %product.owner, "ownership transferred");
        Ok(product)
    }

    async fn try_purchase(&self, product_id: ProductId, buyer: &PrincipalId) -> LedgerResult<Product> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(Product::not_found)?;
        let transfer = product.purchase(buyer, Utc::now())?;
        Ok(self.store.commit_transfer(&transfer).await?)
    }

    /// Ownership audit trail of a product, oldest first.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn history(&self, product_id: ProductId) -> LedgerResult<Vec<OwnershipHistoryEntry>> {
        if self.store.get_product(product_id).await?.is_none() {
            return Err(Product::not_found().into());
        }
        Ok(self.store.ownership_history(product_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::LedgerError;
    use crate::products::ProductRecords;
    use crate::store::InMemoryLedgerStore;
    use trustmark_products::{ProductDraft, ProductState};

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn owner_cannot_buy_own_product() {
        let store: crate::store::SharedStore = Arc::new(InMemoryLedgerStore::new());
        let records = ProductRecords::new(store.clone(), "");
        let transfers = OwnershipTransfers::new(store);
        let product = records
            .create(&ProductDraft::new("Lamp", p("maker@example.com")))
            .await
            .unwrap();

        let err = transfers.purchase(product.token_id, &p("Maker@Example.com")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(ref m) if m == "already owned by you"));

        let unchanged = records.get(product.token_id).await.unwrap();
        assert_eq!(unchanged.state, ProductState::Created);
        assert_eq!(unchanged.owner, p("maker@example.com"));
        assert!(transfers.history(product.token_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purchase_of_unknown_product_is_not_found() {
        let transfers = OwnershipTransfers::new(Arc::new(InMemoryLedgerStore::new()));
        let err = transfers
            .purchase(ProductId::new(5).unwrap(), &p("buyer@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
