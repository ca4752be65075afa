//! Bounded store round trips.
//!
//! Wraps any [`LedgerStore`](super::LedgerStore) so that every call fails with
//! [`StoreError::Timeout`] once the deadline passes. The pending future is
//! dropped; nothing is retried and the caller must not assume the write
//! applied.

use std::future::Future;
use std::time::Duration;

use trustmark_auth::{AdminRecord, PrincipalId};
use trustmark_brands::{ApplicationStatus, Brand, CompanyApplication};
use trustmark_core::{ApplicationId, BrandSlug, ExpectedRevision, ProductId};
use trustmark_products::{Batch, OwnershipHistoryEntry, OwnershipTransfer, Product};

use super::r#trait::{
    AdminStore, ApplicationStore, BatchStore, BrandStore, CounterStore, ProductStore, StoreError,
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Store adapter enforcing a per-call deadline.
#[derive(Debug)]
pub struct DeadlineStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> DeadlineStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "store deadline exceeded");
                Err(StoreError::Timeout(format!(
                    "{operation} exceeded {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: CounterStore> CounterStore for DeadlineStore<S> {
    async fn read_counter(&self) -> Result<Option<u64>, StoreError> {
        self.bounded("read_counter", self.inner.read_counter()).await
    }

    async fn create_counter(&self, initial: u64) -> Result<(), StoreError> {
        self.bounded("create_counter", self.inner.create_counter(initial)).await
    }

    async fn swap_counter(&self, current: u64, next: u64) -> Result<(), StoreError> {
        self.bounded("swap_counter", self.inner.swap_counter(current, next)).await
    }
}

#[async_trait::async_trait]
impl<S: ProductStore> ProductStore for DeadlineStore<S> {
    async fn create_product(&self, product: &Product) -> Result<Product, StoreError> {
        self.bounded("create_product", self.inner.create_product(product)).await
    }

    async fn overwrite_product(&self, product: &Product) -> Result<Product, StoreError> {
        self.bounded("overwrite_product", self.inner.overwrite_product(product)).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.bounded("get_product", self.inner.get_product(id)).await
    }

    async fn list_products_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Product>, StoreError> {
        self.bounded("list_products_by_owner", self.inner.list_products_by_owner(owner))
            .await
    }

    async fn commit_transfer(&self, transfer: &OwnershipTransfer) -> Result<Product, StoreError> {
        self.bounded("commit_transfer", self.inner.commit_transfer(transfer)).await
    }

    async fn ownership_history(&self, id: ProductId) -> Result<Vec<OwnershipHistoryEntry>, StoreError> {
        self.bounded("ownership_history", self.inner.ownership_history(id)).await
    }
}

#[async_trait::async_trait]
impl<S: BrandStore> BrandStore for DeadlineStore<S> {
    async fn create_brand(&self, brand: &Brand) -> Result<Brand, StoreError> {
        self.bounded("create_brand", self.inner.create_brand(brand)).await
    }

    async fn get_brand(&self, slug: &BrandSlug) -> Result<Option<Brand>, StoreError> {
        self.bounded("get_brand", self.inner.get_brand(slug)).await
    }

    async fn list_brands_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Brand>, StoreError> {
        self.bounded("list_brands_by_owner", self.inner.list_brands_by_owner(owner))
            .await
    }

    async fn update_brand(&self, brand: &Brand, expected: ExpectedRevision) -> Result<Brand, StoreError> {
        self.bounded("update_brand", self.inner.update_brand(brand, expected)).await
    }
}

#[async_trait::async_trait]
impl<S: ApplicationStore> ApplicationStore for DeadlineStore<S> {
    async fn create_application(
        &self,
        application: &CompanyApplication,
    ) -> Result<CompanyApplication, StoreError> {
        self.bounded("create_application", self.inner.create_application(application))
            .await
    }

    async fn get_application(&self, id: &ApplicationId) -> Result<Option<CompanyApplication>, StoreError> {
        self.bounded("get_application", self.inner.get_application(id)).await
    }

    async fn list_applications(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<CompanyApplication>, StoreError> {
        self.bounded("list_applications", self.inner.list_applications(status)).await
    }

    async fn update_application(
        &self,
        application: &CompanyApplication,
        expected: ExpectedRevision,
    ) -> Result<CompanyApplication, StoreError> {
        self.bounded(
            "update_application",
            self.inner.update_application(application, expected),
        )
        .await
    }
}

#[async_trait::async_trait]
impl<S: AdminStore> AdminStore for DeadlineStore<S> {
    async fn create_first_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
        self.bounded("create_first_admin", self.inner.create_first_admin(record)).await
    }

    async fn create_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
        self.bounded("create_admin", self.inner.create_admin(record)).await
    }

    async fn get_admin(&self, principal: &PrincipalId) -> Result<Option<AdminRecord>, StoreError> {
        self.bounded("get_admin", self.inner.get_admin(principal)).await
    }

    async fn list_admins(&self) -> Result<Vec<AdminRecord>, StoreError> {
        self.bounded("list_admins", self.inner.list_admins()).await
    }
}

#[async_trait::async_trait]
impl<S: BatchStore> BatchStore for DeadlineStore<S> {
    async fn create_batch(&self, batch: &Batch) -> Result<Batch, StoreError> {
        self.bounded("create_batch", self.inner.create_batch(batch)).await
    }

    async fn list_batches_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Batch>, StoreError> {
        self.bounded("list_batches_by_owner", self.inner.list_batches_by_owner(owner))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedgerStore;

    /// Counter store whose reads never complete.
    struct Stalled;

    #[async_trait::async_trait]
    impl CounterStore for Stalled {
        async fn read_counter(&self) -> Result<Option<u64>, StoreError> {
            std::future::pending().await
        }

        async fn create_counter(&self, _initial: u64) -> Result<(), StoreError> {
            Ok(())
        }

        async fn swap_counter(&self, _current: u64, _next: u64) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stalled_calls_time_out() {
        let store = DeadlineStore::new(Stalled, Duration::from_millis(50));
        assert!(matches!(store.read_counter().await, Err(StoreError::Timeout(_))));
        assert!(store.create_counter(1).await.is_ok());
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let store = DeadlineStore::new(InMemoryLedgerStore::new(), DEFAULT_STORE_TIMEOUT);
        store.create_counter(1).await.unwrap();
        assert_eq!(store.read_counter().await.unwrap(), Some(1));
    }
}
