use std::sync::Arc;

use thiserror::Error;

use trustmark_auth::{AdminRecord, PrincipalId};
use trustmark_brands::{ApplicationStatus, Brand, CompanyApplication};
use trustmark_core::{ApplicationId, BrandSlug, ExpectedRevision, ProductId};
use trustmark_products::{Batch, OwnershipHistoryEntry, OwnershipTransfer, Product};

/// Store operation error.
///
/// These are **infrastructure errors** (uniqueness, optimistic concurrency,
/// availability) as opposed to domain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The globally-unique creation primitive found an existing key.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A conditional write lost against a concurrent writer.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// A conditional write targeted a record that does not exist.
    #[error("missing record: {0}")]
    Missing(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store round trip did not complete within the deadline. The
    /// mutation may or may not have been applied.
    #[error("store deadline exceeded: {0}")]
    Timeout(String),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// The singleton product-id counter.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    async fn read_counter(&self) -> Result<Option<u64>, StoreError>;

    /// Create the counter at `initial`; `AlreadyExists` if it is already there.
    async fn create_counter(&self, initial: u64) -> Result<(), StoreError>;

    /// Atomically move the counter from `current` to `next`; `Conflict` if it
    /// no longer reads `current`.
    async fn swap_counter(&self, current: u64, next: u64) -> Result<(), StoreError>;
}

/// Product records and their ownership audit trail.
#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    /// Strict create; `AlreadyExists` on a duplicate id. Returns the stored
    /// record (revision 1).
    async fn create_product(&self, product: &Product) -> Result<Product, StoreError>;

    /// Write by key regardless of what is stored.
    async fn overwrite_product(&self, product: &Product) -> Result<Product, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn list_products_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Product>, StoreError>;

    /// In one atomic transaction: check the product revision, set owner and
    /// state, close the open history entry and open a new one.
    async fn commit_transfer(&self, transfer: &OwnershipTransfer) -> Result<Product, StoreError>;

    /// History entries of a product, oldest first.
    async fn ownership_history(&self, id: ProductId) -> Result<Vec<OwnershipHistoryEntry>, StoreError>;
}

#[async_trait::async_trait]
pub trait BrandStore: Send + Sync {
    async fn create_brand(&self, brand: &Brand) -> Result<Brand, StoreError>;

    async fn get_brand(&self, slug: &BrandSlug) -> Result<Option<Brand>, StoreError>;

    async fn list_brands_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Brand>, StoreError>;

    async fn update_brand(&self, brand: &Brand, expected: ExpectedRevision) -> Result<Brand, StoreError>;
}

#[async_trait::async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn create_application(&self, application: &CompanyApplication)
    -> Result<CompanyApplication, StoreError>;

    async fn get_application(&self, id: &ApplicationId) -> Result<Option<CompanyApplication>, StoreError>;

    async fn list_applications(&self, status: ApplicationStatus)
    -> Result<Vec<CompanyApplication>, StoreError>;

    /// Conditional write; `Conflict` when the stored revision differs.
    async fn update_application(
        &self,
        application: &CompanyApplication,
        expected: ExpectedRevision,
    ) -> Result<CompanyApplication, StoreError>;
}

#[async_trait::async_trait]
pub trait AdminStore: Send + Sync {
    /// Insert only while the roster is empty; `AlreadyExists` otherwise.
    async fn create_first_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError>;

    /// `AlreadyExists` if the principal is already on the roster.
    async fn create_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError>;

    async fn get_admin(&self, principal: &PrincipalId) -> Result<Option<AdminRecord>, StoreError>;

    async fn list_admins(&self) -> Result<Vec<AdminRecord>, StoreError>;
}

#[async_trait::async_trait]
pub trait BatchStore: Send + Sync {
    async fn create_batch(&self, batch: &Batch) -> Result<Batch, StoreError>;

    async fn list_batches_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Batch>, StoreError>;
}

/// The full transactional store the ledger runs against.
pub trait LedgerStore:
    CounterStore + ProductStore + BrandStore + ApplicationStore + AdminStore + BatchStore
{
}

impl<S> LedgerStore for S where
    S: CounterStore + ProductStore + BrandStore + ApplicationStore + AdminStore + BatchStore
{
}

/// Shared handle every component holds.
pub type SharedStore = Arc<dyn LedgerStore>;
