//! Product record store: mint and persist product records.

use chrono::Utc;
use tracing::instrument;

use trustmark_auth::PrincipalId;
use trustmark_core::{Entity, ProductId};
use trustmark_products::{Product, ProductDraft};

use crate::allocator::IdAllocator;
use crate::error::{LedgerError, LedgerResult};
use crate::store::{SharedStore, StoreError};

#[derive(Clone)]
pub struct ProductRecords {
    store: SharedStore,
    allocator: IdAllocator,
    public_base: String,
}

impl ProductRecords {
    pub fn new(store: SharedStore, public_base: impl Into<String>) -> Self {
        Self {
            allocator: IdAllocator::new(store.clone()),
            store,
            public_base: public_base.into(),
        }
    }

    /// Mint and persist one product. A draft without an id gets a freshly
    /// allocated one; a draft whose id is already taken overwrites it.
    #[instrument(skip(self, draft), fields(creator = %draft.creator, name = %draft.name), err)]
    pub async fn create(&self, draft: &ProductDraft) -> LedgerResult<Product> {
        draft.validate()?;
        let id = match draft.id {
            Some(id) => id,
            None => self.allocator.allocate().await?,
        };
        let product = Product::mint(id, draft, Utc::now(), &self.public_base)?;

        match self.store.create_product(&product).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::AlreadyExists(_)) => {
                tracing::warn!(product_id = %id, "product id already present, overwriting");
                Ok(self.store.overwrite_product(&product).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create `count` editions of the same draft, one after the other.
    ///
    /// Not atomic across editions. When an edition after the first fails the
    /// error is [`LedgerError::PartialBatch`] carrying what was persisted.
    #[instrument(skip(self, draft), fields(creator = %draft.creator), err)]
    pub async fn create_editions(&self, draft: &ProductDraft, count: i64) -> LedgerResult<Vec<Product>> {
        let drafts = draft.editions(count)?;
        let mut created = Vec::with_capacity(drafts.len());
        for edition in &drafts {
            match self.create(edition).await {
                Ok(product) => created.push(product),
                Err(cause) if created.is_empty() => return Err(cause),
                Err(cause) => {
                    tracing::warn!(
                        created = created.len(),
                        requested = drafts.len(),
                        error = %cause,
                        "edition batch stopped part way"
                    );
                    return Err(LedgerError::PartialBatch {
                        created,
                        cause: Box::new(cause),
                    });
                }
            }
        }
        Ok(created)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn get(&self, id: ProductId) -> LedgerResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| Product::not_found().into())
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    pub async fn list_by_owner(&self, owner: &PrincipalId) -> LedgerResult<Vec<Product>> {
        Ok(self.store.list_products_by_owner(owner).await?)
    }
}
