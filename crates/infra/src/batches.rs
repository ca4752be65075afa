//! Batch labels attached to products at creation time.

use chrono::Utc;
use tracing::instrument;

use trustmark_auth::PrincipalId;
use trustmark_products::Batch;

use crate::error::LedgerResult;
use crate::store::SharedStore;

#[derive(Clone)]
pub struct Batches {
    store: SharedStore,
}

impl Batches {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    pub async fn create(&self, title: Option<&str>, owner: &PrincipalId) -> LedgerResult<Batch> {
        let batch = Batch::new(title, owner.clone(), Utc::now())?;
        Ok(self.store.create_batch(&batch).await?)
    }

    /// Batches of `owner`, newest first.
    #[instrument(skip(self), fields(owner = %owner), err)]
    pub async fn list_by_owner(&self, owner: &PrincipalId) -> LedgerResult<Vec<Batch>> {
        Ok(self.store.list_batches_by_owner(owner).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryLedgerStore;

    #[tokio::test]
    async fn batches_are_scoped_to_their_owner() {
        let batches = Batches::new(Arc::new(InMemoryLedgerStore::new()));
        let owner = PrincipalId::parse("maker@example.com").unwrap();
        let batch = batches.create(Some("Spring run"), &owner).await.unwrap();
        assert_eq!(batch.title, "Spring run");
        assert_eq!(batches.list_by_owner(&owner).await.unwrap(), vec![batch]);

        let other = PrincipalId::parse("other@example.com").unwrap();
        assert!(batches.list_by_owner(&other).await.unwrap().is_empty());
    }
}
