use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use trustmark_auth::{AdminRecord, PrincipalId};
use trustmark_brands::{ApplicationStatus, Brand, CompanyApplication};
use trustmark_core::{ApplicationId, BatchId, BrandSlug, ExpectedRevision, ProductId};
use trustmark_products::{Batch, OwnershipHistoryEntry, OwnershipTransfer, Product, record_transfer};

use super::r#trait::{
    AdminStore, ApplicationStore, BatchStore, BrandStore, CounterStore, ProductStore, StoreError,
};

#[derive(Debug, Default)]
struct Collections {
    counter: Option<u64>,
    products: BTreeMap<ProductId, Product>,
    history: Vec<OwnershipHistoryEntry>,
    brands: HashMap<BrandSlug, Brand>,
    applications: HashMap<ApplicationId, CompanyApplication>,
    admins: BTreeMap<PrincipalId, AdminRecord>,
    batches: HashMap<BatchId, Batch>,
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Every operation runs under one lock, which gives
/// the same single-document atomicity the ledger expects of a real store.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Collections>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

fn check_revision(kind: &str, expected: ExpectedRevision, actual: u64) -> Result<(), StoreError> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!(
            "{kind}: expected {expected:?}, found {actual}"
        )))
    }
}

#[async_trait::async_trait]
impl CounterStore for InMemoryLedgerStore {
    async fn read_counter(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.read()?.counter)
    }

    async fn create_counter(&self, initial: u64) -> Result<(), StoreError> {
        let mut c = self.write()?;
        if c.counter.is_some() {
            return Err(StoreError::AlreadyExists("counter".to_string()));
        }
        c.counter = Some(initial);
        Ok(())
    }

    async fn swap_counter(&self, current: u64, next: u64) -> Result<(), StoreError> {
        let mut c = self.write()?;
        match c.counter {
            Some(v) if v == current => {
                c.counter = Some(next);
                Ok(())
            }
            Some(v) => Err(StoreError::Conflict(format!("counter: expected {current}, found {v}"))),
            None => Err(StoreError::Missing("counter".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl ProductStore for InMemoryLedgerStore {
    async fn create_product(&self, product: &Product) -> Result<Product, StoreError> {
        let mut c = self.write()?;
        if c.products.contains_key(&product.token_id) {
            return Err(StoreError::AlreadyExists(format!("product {}", product.token_id)));
        }
        let mut stored = product.clone();
        stored.revision = 1;
        c.products.insert(stored.token_id, stored.clone());
        Ok(stored)
    }

    async fn overwrite_product(&self, product: &Product) -> Result<Product, StoreError> {
        let mut c = self.write()?;
        let revision = c.products.get(&product.token_id).map_or(0, |p| p.revision);
        let mut stored = product.clone();
        stored.revision = revision + 1;
        c.products.insert(stored.token_id, stored.clone());
        Ok(stored)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn list_products_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.owner == *owner)
            .cloned()
            .collect())
    }

    async fn commit_transfer(&self, transfer: &OwnershipTransfer) -> Result<Product, StoreError> {
        let mut c = self.write()?;
        let c = &mut *c;
        let product = c
            .products
            .get_mut(&transfer.product_id)
            .ok_or_else(|| StoreError::Missing(format!("product {}", transfer.product_id)))?;
        check_revision("product", transfer.expected, product.revision)?;

        product.apply_transfer(transfer);
        product.revision += 1;
        let updated = product.clone();
        record_transfer(&mut c.history, transfer);
        Ok(updated)
    }

    async fn ownership_history(&self, id: ProductId) -> Result<Vec<OwnershipHistoryEntry>, StoreError> {
        Ok(self
            .read()?
            .history
            .iter()
            .filter(|e| e.token_id == id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl BrandStore for InMemoryLedgerStore {
    async fn create_brand(&self, brand: &Brand) -> Result<Brand, StoreError> {
        let mut c = self.write()?;
        if c.brands.contains_key(&brand.slug) {
            return Err(StoreError::AlreadyExists(format!("brand {}", brand.slug)));
        }
        let mut stored = brand.clone();
        stored.revision = 1;
        c.brands.insert(stored.slug.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_brand(&self, slug: &BrandSlug) -> Result<Option<Brand>, StoreError> {
        Ok(self.read()?.brands.get(slug).cloned())
    }

    async fn list_brands_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Brand>, StoreError> {
        let mut brands: Vec<Brand> = self
            .read()?
            .brands
            .values()
            .filter(|b| b.owner == *owner)
            .cloned()
            .collect();
        brands.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.slug.cmp(&b.slug)));
        Ok(brands)
    }

    async fn update_brand(&self, brand: &Brand, expected: ExpectedRevision) -> Result<Brand, StoreError> {
        let mut c = self.write()?;
        let current = c
            .brands
            .get_mut(&brand.slug)
            .ok_or_else(|| StoreError::Missing(format!("brand {}", brand.slug)))?;
        check_revision("brand", expected, current.revision)?;
        let revision = current.revision + 1;
        *current = Brand {
            revision,
            ..brand.clone()
        };
        Ok(current.clone())
    }
}

#[async_trait::async_trait]
impl ApplicationStore for InMemoryLedgerStore {
    async fn create_application(
        &self,
        application: &CompanyApplication,
    ) -> Result<CompanyApplication, StoreError> {
        let mut c = self.write()?;
        if c.applications.contains_key(&application.id) {
            return Err(StoreError::AlreadyExists(format!("application {}", application.id)));
        }
        let mut stored = application.clone();
        stored.revision = 1;
        c.applications.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_application(&self, id: &ApplicationId) -> Result<Option<CompanyApplication>, StoreError> {
        Ok(self.read()?.applications.get(id).cloned())
    }

    async fn list_applications(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<CompanyApplication>, StoreError> {
        let mut apps: Vec<CompanyApplication> = self
            .read()?
            .applications
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apps)
    }

    async fn update_application(
        &self,
        application: &CompanyApplication,
        expected: ExpectedRevision,
    ) -> Result<CompanyApplication, StoreError> {
        let mut c = self.write()?;
        let current = c
            .applications
            .get_mut(&application.id)
            .ok_or_else(|| StoreError::Missing(format!("application {}", application.id)))?;
        check_revision("application", expected, current.revision)?;
        let revision = current.revision + 1;
        *current = CompanyApplication {
            revision,
            ..application.clone()
        };
        Ok(current.clone())
    }
}

#[async_trait::async_trait]
impl AdminStore for InMemoryLedgerStore {
    async fn create_first_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
        let mut c = self.write()?;
        if !c.admins.is_empty() {
            return Err(StoreError::AlreadyExists("admin roster already initialized".to_string()));
        }
        c.admins.insert(record.principal.clone(), record.clone());
        Ok(record.clone())
    }

    async fn create_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
        let mut c = self.write()?;
        if c.admins.contains_key(&record.principal) {
            return Err(StoreError::AlreadyExists(format!("admin {}", record.principal)));
        }
        c.admins.insert(record.principal.clone(), record.clone());
        Ok(record.clone())
    }

    async fn get_admin(&self, principal: &PrincipalId) -> Result<Option<AdminRecord>, StoreError> {
        Ok(self.read()?.admins.get(principal).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<AdminRecord>, StoreError> {
        Ok(self.read()?.admins.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl BatchStore for InMemoryLedgerStore {
    async fn create_batch(&self, batch: &Batch) -> Result<Batch, StoreError> {
        let mut c = self.write()?;
        if c.batches.contains_key(&batch.id) {
            return Err(StoreError::AlreadyExists(format!("batch {}", batch.id)));
        }
        c.batches.insert(batch.id.clone(), batch.clone());
        Ok(batch.clone())
    }

    async fn list_batches_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Batch>, StoreError> {
        let mut batches: Vec<Batch> = self
            .read()?
            .batches
            .values()
            .filter(|b| b.owner == *owner)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trustmark_products::{ProductDraft, open_entries};

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    fn product(id: u64) -> Product {
        let draft = ProductDraft::new("Lamp", p("maker@x.io"));
        Product::mint(ProductId::new(id).unwrap(), &draft, Utc::now(), "").unwrap()
    }

    #[tokio::test]
    async fn counter_is_create_once_then_compare_and_swap() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(store.read_counter().await.unwrap(), None);
        store.create_counter(1).await.unwrap();
        assert!(matches!(store.create_counter(1).await, Err(StoreError::AlreadyExists(_))));
        store.swap_counter(1, 2).await.unwrap();
        assert!(matches!(store.swap_counter(1, 2).await, Err(StoreError::Conflict(_))));
        assert_eq!(store.read_counter().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn stale_transfer_is_rejected_without_side_effects() {
        let store = InMemoryLedgerStore::new();
        let stored = store.create_product(&product(1)).await.unwrap();
        assert_eq!(stored.revision, 1);

        let t1 = stored.purchase(&p("a@x.io"), Utc::now()).unwrap();
        let t2 = stored.purchase(&p("b@x.io"), Utc::now()).unwrap();
        store.commit_transfer(&t1).await.unwrap();
        assert!(matches!(store.commit_transfer(&t2).await, Err(StoreError::Conflict(_))));

        let current = store.get_product(stored.token_id).await.unwrap().unwrap();
        assert_eq!(current.owner, p("a@x.io"));
        let history = store.ownership_history(stored.token_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(open_entries(&history, stored.token_id), 1);
    }

    #[tokio::test]
    async fn duplicate_product_create_fails_but_overwrite_succeeds() {
        let store = InMemoryLedgerStore::new();
        store.create_product(&product(5)).await.unwrap();
        assert!(matches!(
            store.create_product(&product(5)).await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(store.overwrite_product(&product(5)).await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn first_admin_only_once() {
        let store = InMemoryLedgerStore::new();
        let now = Utc::now();
        store
            .create_first_admin(&AdminRecord::new(p("root@x.io"), None, now))
            .await
            .unwrap();
        assert!(matches!(
            store
                .create_first_admin(&AdminRecord::new(p("other@x.io"), None, now))
                .await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(store.list_admins().await.unwrap().len(), 1);
    }
}
