//! Integration tests for the ledger components over a shared store.
//!
//! Tests: allocator → product store → transfer engine → history,
//! moderation → brand registry.
//!
//! Verifies:
//! - Concurrent allocations never hand out the same id
//! - Ownership chains keep exactly one open history entry
//! - Approvals verify the brand exactly once; later decisions conflict
//! - Edition batches are numbered and partial failures are reported

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use trustmark_auth::{AdminRecord, PrincipalId};
    use trustmark_brands::{
        ApplicantDetails, ApplicationStatus, Brand, CompanyApplication, Decision,
    };
    use trustmark_core::{ApplicationId, BrandSlug, ExpectedRevision, ProductId};
    use trustmark_products::{
        Batch, OwnershipHistoryEntry, OwnershipTransfer, Product, ProductDraft, ProductState,
        open_entries,
    };

    use crate::allocator::IdAllocator;
    use crate::brands::BrandRegistry;
    use crate::error::LedgerError;
    use crate::moderation::Moderation;
    use crate::products::ProductRecords;
    use crate::store::{
        AdminStore, ApplicationStore, BatchStore, BrandStore, CounterStore, InMemoryLedgerStore,
        ProductStore, SharedStore, StoreError,
    };
    use crate::transfer::OwnershipTransfers;

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    fn shared() -> SharedStore {
        Arc::new(InMemoryLedgerStore::new())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_are_distinct() {
        let allocator = IdAllocator::new(shared());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move { allocator.allocate().await })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap().unwrap();
            assert!(id.get() >= 1);
            assert!(ids.insert(id), "duplicate id {id}");
        }
        assert_eq!(ids.len(), 16);
    }

    #[tokio::test]
    async fn purchase_chain_keeps_one_open_entry() {
        let store = shared();
        let records = ProductRecords::new(store.clone(), "");
        let transfers = OwnershipTransfers::new(store.clone());
        let product = records
            .create(&ProductDraft::new("Field Jacket", p("maker@example.com")))
            .await
            .unwrap();

        let buyers = ["ana@example.com", "ben@example.com", "cleo@example.com", "dev@example.com"];
        for buyer in buyers {
            let updated = transfers.purchase(product.token_id, &p(buyer)).await.unwrap();
            assert_eq!(updated.state, ProductState::Purchased);
            assert_eq!(updated.owner, p(buyer));
            assert_eq!(updated.seller, p("maker@example.com"));

            let history = transfers.history(product.token_id).await.unwrap();
            assert_eq!(open_entries(&history, product.token_id), 1);
        }

        let history = transfers.history(product.token_id).await.unwrap();
        assert_eq!(history.len(), buyers.len());
        assert!(history[..buyers.len() - 1].iter().all(|e| e.released_at.is_some()));
        assert_eq!(history.last().unwrap().owner, p("dev@example.com"));

        // The final owner cannot buy again.
        let err = transfers
            .purchase(product.token_id, &p("dev@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(transfers.history(product.token_id).await.unwrap().len(), buyers.len());
    }

    #[tokio::test]
    async fn approval_verifies_brand_and_second_decision_conflicts() {
        let store = shared();
        let brands = BrandRegistry::new(store.clone());
        let moderation = Moderation::new(store, brands.clone());

        let details = ApplicantDetails {
            brand_name: "Aurora Watch".to_string(),
            contact_email: "Founder@Aurora.example".to_string(),
            ..ApplicantDetails::default()
        };
        let app = moderation.submit(&p("founder@aurora.example"), details).await.unwrap();

        let outcome = moderation
            .decide(&app.id, &Decision::Approve, &p("admin@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome.application.status, ApplicationStatus::Approved);
        let brand = outcome.brand.unwrap();
        assert!(brand.verified);
        assert_eq!(brand.owner, p("founder@aurora.example"));
        assert_eq!(brand.verified_by, Some(p("admin@example.com")));

        let stored = brands.get(&BrandSlug::from_name("Aurora Watch")).await.unwrap();
        assert_eq!(stored, brand);

        let err = moderation
            .decide(&app.id, &Decision::Reject { reason: None }, &p("admin@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(ref m) if m == "already processed"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_decisions_have_one_winner() {
        let store = shared();
        let moderation = Moderation::new(store.clone(), BrandRegistry::new(store));
        let details = ApplicantDetails {
            brand_name: "Kestrel".to_string(),
            contact_email: "owner@kestrel.example".to_string(),
            ..ApplicantDetails::default()
        };
        let app = moderation.submit(&p("owner@kestrel.example"), details).await.unwrap();

        let approve = {
            let moderation = moderation.clone();
            let id = app.id.clone();
            tokio::spawn(async move {
                moderation
                    .decide(&id, &Decision::Approve, &p("a1@example.com"))
                    .await
            })
        };
        let reject = {
            let moderation = moderation.clone();
            let id = app.id.clone();
            tokio::spawn(async move {
                moderation
                    .decide(&id, &Decision::Reject { reason: None }, &p("a2@example.com"))
                    .await
            })
        };

        let results = [approve.await.unwrap(), reject.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(err, LedgerError::Conflict(_)), "unexpected {err:?}");
            }
        }

        let final_status = moderation.get(&app.id).await.unwrap().status;
        assert!(final_status.is_terminal());
    }

    #[tokio::test]
    async fn three_editions_share_owner_and_number_in_order() {
        let records = ProductRecords::new(shared(), "https://ledger.example");
        let draft = ProductDraft::new("Aurora Watch", p("maker@example.com"));
        let editions = records.create_editions(&draft, 3).await.unwrap();

        assert_eq!(editions.len(), 3);
        let fingerprints: HashSet<_> = editions.iter().map(|e| e.serial_hash.clone()).collect();
        assert_eq!(fingerprints.len(), 3);
        for (i, edition) in editions.iter().enumerate() {
            let n = i as u32 + 1;
            assert_eq!(edition.edition_no, n);
            assert_eq!(edition.edition_total, 3);
            assert!(edition.meta.serial.contains(&format!("-{n}/3-")), "{}", edition.meta.serial);
            assert_eq!(edition.owner, p("maker@example.com"));
            assert_eq!(edition.seller, p("maker@example.com"));
        }
    }

    /// Store whose product writes fail after a fixed number of successes.
    struct FlakyProducts {
        inner: InMemoryLedgerStore,
        writes_left: AtomicUsize,
    }

    impl FlakyProducts {
        fn new(writes: usize) -> Self {
            Self {
                inner: InMemoryLedgerStore::new(),
                writes_left: AtomicUsize::new(writes),
            }
        }

        fn take_write(&self) -> Result<(), StoreError> {
            self.writes_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .map(|_| ())
                .map_err(|_| StoreError::Unavailable("injected outage".to_string()))
        }
    }

    #[async_trait::async_trait]
    impl CounterStore for FlakyProducts {
        async fn read_counter(&self) -> Result<Option<u64>, StoreError> {
            self.inner.read_counter().await
        }
        async fn create_counter(&self, initial: u64) -> Result<(), StoreError> {
            self.inner.create_counter(initial).await
        }
        async fn swap_counter(&self, current: u64, next: u64) -> Result<(), StoreError> {
            self.inner.swap_counter(current, next).await
        }
    }

    #[async_trait::async_trait]
    impl ProductStore for FlakyProducts {
        async fn create_product(&self, product: &Product) -> Result<Product, StoreError> {
            self.take_write()?;
            self.inner.create_product(product).await
        }
        async fn overwrite_product(&self, product: &Product) -> Result<Product, StoreError> {
            self.take_write()?;
            self.inner.overwrite_product(product).await
        }
        async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
            self.inner.get_product(id).await
        }
        async fn list_products_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Product>, StoreError> {
            self.inner.list_products_by_owner(owner).await
        }
        async fn commit_transfer(&self, transfer: &OwnershipTransfer) -> Result<Product, StoreError> {
            self.inner.commit_transfer(transfer).await
        }
        async fn ownership_history(&self, id: ProductId) -> Result<Vec<OwnershipHistoryEntry>, StoreError> {
            self.inner.ownership_history(id).await
        }
    }

    #[async_trait::async_trait]
    impl BrandStore for FlakyProducts {
        async fn create_brand(&self, brand: &Brand) -> Result<Brand, StoreError> {
            self.inner.create_brand(brand).await
        }
        async fn get_brand(&self, slug: &BrandSlug) -> Result<Option<Brand>, StoreError> {
            self.inner.get_brand(slug).await
        }
        async fn list_brands_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Brand>, StoreError> {
            self.inner.list_brands_by_owner(owner).await
        }
        async fn update_brand(&self, brand: &Brand, expected: ExpectedRevision) -> Result<Brand, StoreError> {
            self.inner.update_brand(brand, expected).await
        }
    }

    #[async_trait::async_trait]
    impl ApplicationStore for FlakyProducts {
        async fn create_application(
            &self,
            application: &CompanyApplication,
        ) -> Result<CompanyApplication, StoreError> {
            self.inner.create_application(application).await
        }
        async fn get_application(&self, id: &ApplicationId) -> Result<Option<CompanyApplication>, StoreError> {
            self.inner.get_application(id).await
        }
        async fn list_applications(
            &self,
            status: ApplicationStatus,
        ) -> Result<Vec<CompanyApplication>, StoreError> {
            self.inner.list_applications(status).await
        }
        async fn update_application(
            &self,
            application: &CompanyApplication,
            expected: ExpectedRevision,
        ) -> Result<CompanyApplication, StoreError> {
            self.inner.update_application(application, expected).await
        }
    }

    #[async_trait::async_trait]
    impl AdminStore for FlakyProducts {
        async fn create_first_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
            self.inner.create_first_admin(record).await
        }
        async fn create_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
            self.inner.create_admin(record).await
        }
        async fn get_admin(&self, principal: &PrincipalId) -> Result<Option<AdminRecord>, StoreError> {
            self.inner.get_admin(principal).await
        }
        async fn list_admins(&self) -> Result<Vec<AdminRecord>, StoreError> {
            self.inner.list_admins().await
        }
    }

    #[async_trait::async_trait]
    impl BatchStore for FlakyProducts {
        async fn create_batch(&self, batch: &Batch) -> Result<Batch, StoreError> {
            self.inner.create_batch(batch).await
        }
        async fn list_batches_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Batch>, StoreError> {
            self.inner.list_batches_by_owner(owner).await
        }
    }

    #[tokio::test]
    async fn failure_mid_batch_reports_persisted_editions() {
        let store: SharedStore = Arc::new(FlakyProducts::new(2));
        let records = ProductRecords::new(store, "");
        let draft = ProductDraft::new("Aurora Watch", p("maker@example.com"));

        match records.create_editions(&draft, 3).await {
            Err(LedgerError::PartialBatch { created, cause }) => {
                assert_eq!(created.len(), 2);
                assert_eq!(created[0].edition_no, 1);
                assert_eq!(created[1].edition_no, 2);
                assert!(cause.is_retryable());
                for product in &created {
                    assert_eq!(records.get(product.token_id).await.unwrap(), *product);
                }
            }
            other => panic!("expected partial batch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_on_first_edition_is_plain() {
        let store: SharedStore = Arc::new(FlakyProducts::new(0));
        let records = ProductRecords::new(store, "");
        let draft = ProductDraft::new("Aurora Watch", p("maker@example.com"));
        let err = records.create_editions(&draft, 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::Transient(_)));
    }
}
