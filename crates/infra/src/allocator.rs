//! Product identifier allocation.
//!
//! One counter record holds the last issued id. The first caller creates it
//! at 1 (create-if-absent, failing closed when a concurrent caller won); every
//! later caller moves it forward with a compare-and-swap. A lost race surfaces
//! as contention and is retried by [`retry_on_conflict`]. Ids strictly
//! increase; a caller that fails after allocating leaves a gap.

use tracing::instrument;

use trustmark_core::ProductId;

use crate::error::{LedgerError, LedgerResult, MAX_TRANSACTION_ATTEMPTS, retry_on_conflict};
use crate::store::{SharedStore, StoreError};

#[derive(Clone)]
pub struct IdAllocator {
    store: SharedStore,
}

impl IdAllocator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Issue the next product id.
    #[instrument(skip(self), err)]
    pub async fn allocate(&self) -> LedgerResult<ProductId> {
        let raw = retry_on_conflict("allocate_id", MAX_TRANSACTION_ATTEMPTS, move || self.try_allocate()).await?;
        let id = ProductId::new(raw)?;
        tracing::info!(product_id = %id, "product id allocated");
        Ok(id)
    }

    async fn try_allocate(&self) -> LedgerResult<u64> {
        match self.store.read_counter().await? {
            None => match self.store.create_counter(1).await {
                Ok(()) => Ok(1),
                // Someone else initialised it between our read and create.
                Err(StoreError::AlreadyExists(msg)) => Err(LedgerError::Contention(msg)),
                Err(e) => Err(e.into()),
            },
            Some(current) => {
                let next = current
                    .checked_add(1)
                    .ok_or_else(|| LedgerError::Store(StoreError::Corrupt("id counter overflow".to_string())))?;
                self.store.swap_counter(current, next).await?;
                Ok(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryLedgerStore;

    #[tokio::test]
    async fn first_allocation_is_one_and_then_increments() {
        let allocator = IdAllocator::new(Arc::new(InMemoryLedgerStore::new()));
        assert_eq!(allocator.allocate().await.unwrap().get(), 1);
        assert_eq!(allocator.allocate().await.unwrap().get(), 2);
        assert_eq!(allocator.allocate().await.unwrap().get(), 3);
    }
}
