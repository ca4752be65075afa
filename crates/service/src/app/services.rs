//! `LedgerService`: the facade every transport calls.
//!
//! Store selection happens once in [`LedgerService::connect`]: Postgres when a
//! database URL is configured, the in-memory store otherwise, both behind a
//! [`DeadlineStore`]. Authorization lives here; the infra components take
//! already-authorized principals.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use trustmark_auth::{
    AdminRecord, IdentityClaims, IdentityPolicy, PrincipalId, Requester, Role, authorize,
};
use trustmark_brands::{ApplicationStatus, Brand, CompanyApplication, Decision};
use trustmark_core::{ApplicationId, BatchId, BrandSlug, ProductId};
use trustmark_infra::store::{
    DeadlineStore, InMemoryLedgerStore, PostgresLedgerStore, SharedStore, StoreError,
};
use trustmark_infra::{
    AdminRoster, Batches, BrandRegistry, ConfigError, LedgerConfig, LedgerError, LedgerResult,
    Moderation, OwnershipTransfers, ProductRecords,
};
use trustmark_products::{Batch, OwnershipHistoryEntry, Product, ProductDraft, VerificationView, project};

use super::dto::{
    AdminList, BatchList, CreateBatchRequest, CreateBrandRequest, CreateProductRequest,
    CreatedProducts, DecideRequest, DecideResponse, GrantAdminRequest, MeResponse, PurchaseResponse,
    SubmitApplicationRequest, SubmitApplicationResponse,
};
use crate::context::principal_from_claims;

/// Startup failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Clone)]
pub struct LedgerService {
    policy: Arc<dyn IdentityPolicy>,
    roster: AdminRoster,
    brands: BrandRegistry,
    products: ProductRecords,
    transfers: OwnershipTransfers,
    moderation: Moderation,
    batches: Batches,
}

impl LedgerService {
    pub fn new(store: SharedStore, policy: Arc<dyn IdentityPolicy>, public_base: &str) -> Self {
        let brands = BrandRegistry::new(store.clone());
        Self {
            policy,
            roster: AdminRoster::new(store.clone()),
            products: ProductRecords::new(store.clone(), public_base),
            transfers: OwnershipTransfers::new(store.clone()),
            moderation: Moderation::new(store.clone(), brands.clone()),
            batches: Batches::new(store),
            brands,
        }
    }

    /// Build the service from configuration and seed the default admin.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, ServiceError> {
        let timeout = config.store_timeout();
        let store: SharedStore = match config.database_url.as_deref() {
            Some(url) => {
                let postgres = PostgresLedgerStore::connect(url).await?;
                postgres.install_schema().await?;
                tracing::info!(timeout_ms = timeout.as_millis() as u64, "using postgres store");
                Arc::new(DeadlineStore::new(postgres, timeout))
            }
            None => {
                tracing::warn!("no database configured; using in-memory store");
                Arc::new(DeadlineStore::new(InMemoryLedgerStore::new(), timeout))
            }
        };

        let service = Self::new(store, Arc::new(config.identity_policy()), &config.public_base);
        if let Some(admin) = &config.default_admin {
            service.roster.ensure_default_admin(admin).await?;
        }
        Ok(service)
    }

    /// Resolve roles for a principal: the configured policy plus what the
    /// store knows (admin roster membership, brand ownership).
    pub async fn requester(&self, principal: Option<PrincipalId>) -> LedgerResult<Requester> {
        let Some(principal) = principal else {
            return Ok(Requester::anonymous());
        };
        let mut roles = self.policy.roles(&principal);
        if !roles.contains(&Role::ADMIN) && self.roster.contains(&principal).await? {
            roles.insert(0, Role::ADMIN);
        }
        if !roles.contains(&Role::MANUFACTURER) && !self.brands.list_by_owner(&principal).await?.is_empty() {
            roles.push(Role::MANUFACTURER);
        }
        Ok(Requester::with_roles(principal, roles))
    }

    pub async fn requester_from_claims(&self, claims: Option<&IdentityClaims>) -> LedgerResult<Requester> {
        let principal = principal_from_claims(claims, Utc::now())?;
        self.requester(principal).await
    }

    // -- products ----------------------------------------------------------

    /// Personal creation: no brand attached.
    pub async fn create_product(
        &self,
        requester: &Requester,
        request: CreateProductRequest,
    ) -> LedgerResult<CreatedProducts> {
        let creator = requester.require_authenticated()?.clone();
        let draft = product_draft(&request, creator, None)?;
        self.create_from_draft(&draft, request.edition_count).await
    }

    /// Manufacturer creation: stamps the creator's first brand.
    pub async fn create_brand_product(
        &self,
        requester: &Requester,
        request: CreateProductRequest,
    ) -> LedgerResult<CreatedProducts> {
        let creator = authorize(requester, &Role::MANUFACTURER)?.clone();
        let brand = self
            .brands
            .first_owned_by(&creator)
            .await?
            .ok_or_else(|| LedgerError::forbidden("no brand for this account"))?;
        let draft = product_draft(&request, creator, Some(brand.slug))?;
        self.create_from_draft(&draft, request.edition_count).await
    }

    async fn create_from_draft(
        &self,
        draft: &ProductDraft,
        edition_count: Option<i64>,
    ) -> LedgerResult<CreatedProducts> {
        match edition_count {
            Some(count) if count > 1 => Ok(CreatedProducts::Many(
                self.products.create_editions(draft, count).await?,
            )),
            _ => Ok(CreatedProducts::One(Box::new(self.products.create(draft).await?))),
        }
    }

    pub async fn purchase(&self, requester: &Requester, product_id: ProductId) -> LedgerResult<PurchaseResponse> {
        let buyer = requester.require_authenticated()?;
        let product = self.transfers.purchase(product_id, buyer).await?;
        Ok(PurchaseResponse {
            ok: true,
            state: product.state,
        })
    }

    /// Requester-scoped verification view. Anonymous callers are allowed.
    pub async fn verify_product(&self, requester: &Requester, product_id: ProductId) -> LedgerResult<VerificationView> {
        let product = self.products.get(product_id).await?;
        Ok(project(&product, requester))
    }

    /// Ownership audit trail; visible to the current owner and administrators.
    pub async fn product_history(
        &self,
        requester: &Requester,
        product_id: ProductId,
    ) -> LedgerResult<Vec<OwnershipHistoryEntry>> {
        let principal = requester.require_authenticated()?;
        let product = self.products.get(product_id).await?;
        if !requester.is_admin() && !product.is_owned_by(principal) {
            return Err(LedgerError::forbidden("not the owner"));
        }
        self.transfers.history(product_id).await
    }

    pub async fn my_products(&self, requester: &Requester) -> LedgerResult<Vec<Product>> {
        let owner = requester.require_authenticated()?;
        self.products.list_by_owner(owner).await
    }

    // -- brands ------------------------------------------------------------

    /// Register a brand for the caller, or for `owner` when an administrator asks.
    pub async fn create_brand(&self, requester: &Requester, request: CreateBrandRequest) -> LedgerResult<Brand> {
        let caller = requester.require_authenticated()?;
        let owner = match PrincipalId::parse_optional(request.owner.as_deref())? {
            Some(owner) if owner != *caller => {
                requester.require_admin()?;
                owner
            }
            _ => caller.clone(),
        };
        self.brands.create(&request.name, &owner).await
    }

    pub async fn get_brand(&self, slug: &str) -> LedgerResult<Brand> {
        let slug: BrandSlug = slug.parse()?;
        self.brands.get(&slug).await
    }

    pub async fn verify_brand(&self, requester: &Requester, slug: &str) -> LedgerResult<Brand> {
        let admin = requester.require_admin()?;
        let slug: BrandSlug = slug.parse()?;
        self.brands.verify(&slug, admin).await
    }

    pub async fn unverify_brand(&self, requester: &Requester, slug: &str) -> LedgerResult<Brand> {
        requester.require_admin()?;
        let slug: BrandSlug = slug.parse()?;
        self.brands.unverify(&slug).await
    }

    // -- moderation --------------------------------------------------------

    pub async fn submit_application(
        &self,
        requester: &Requester,
        request: SubmitApplicationRequest,
    ) -> LedgerResult<SubmitApplicationResponse> {
        let applicant = requester.require_authenticated()?;
        let application = self.moderation.submit(applicant, request).await?;
        Ok(SubmitApplicationResponse::from(&application))
    }

    /// Applications by status (default `pending`), newest first.
    pub async fn list_applications(
        &self,
        requester: &Requester,
        status: Option<&str>,
    ) -> LedgerResult<Vec<CompanyApplication>> {
        requester.require_admin()?;
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<ApplicationStatus>()?,
            None => ApplicationStatus::Pending,
        };
        self.moderation.list(status).await
    }

    pub async fn decide_application(
        &self,
        requester: &Requester,
        id: &str,
        request: DecideRequest,
    ) -> LedgerResult<DecideResponse> {
        let reviewer = requester.require_admin()?;
        let id: ApplicationId = id.parse()?;
        let decision = Decision::parse(&request.action, request.reason.as_deref())?;
        let outcome = self.moderation.decide(&id, &decision, reviewer).await?;
        Ok(DecideResponse {
            ok: true,
            status: outcome.application.status,
            brand: outcome.brand,
        })
    }

    // -- admin roster ------------------------------------------------------

    pub async fn bootstrap_admin(&self, requester: &Requester) -> LedgerResult<AdminRecord> {
        let principal = requester.require_authenticated()?;
        self.roster.bootstrap(principal).await
    }

    pub async fn grant_admin(&self, requester: &Requester, request: GrantAdminRequest) -> LedgerResult<AdminRecord> {
        let admin = requester.require_admin()?;
        self.roster.grant(&request.email, admin).await
    }

    pub async fn list_admins(&self, requester: &Requester) -> LedgerResult<AdminList> {
        requester.require_admin()?;
        Ok(AdminList {
            admins: self.roster.list().await?,
        })
    }

    // -- batches & account -------------------------------------------------

    pub async fn create_batch(&self, requester: &Requester, request: CreateBatchRequest) -> LedgerResult<Batch> {
        let owner = requester.require_authenticated()?;
        self.batches.create(request.title.as_deref(), owner).await
    }

    pub async fn list_batches(&self, requester: &Requester) -> LedgerResult<BatchList> {
        let owner = requester.require_authenticated()?;
        Ok(BatchList {
            batches: self.batches.list_by_owner(owner).await?,
        })
    }

    pub async fn me(&self, requester: &Requester) -> LedgerResult<MeResponse> {
        let principal = requester.require_authenticated()?;
        Ok(MeResponse {
            principal: principal.clone(),
            is_admin: requester.is_admin(),
            is_manufacturer: requester.has_role(&Role::MANUFACTURER),
            brands: self.brands.list_by_owner(principal).await?,
        })
    }
}

fn product_draft(
    request: &CreateProductRequest,
    creator: PrincipalId,
    brand_slug: Option<BrandSlug>,
) -> LedgerResult<ProductDraft> {
    let batch_id = match request.batch_id.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        Some(raw) => Some(BatchId::from_token(raw)?),
        None => None,
    };
    Ok(ProductDraft {
        sku: request.sku.clone(),
        manufactured_at: request.manufactured_at.clone(),
        image: request.image.clone(),
        certificates: request.certificates.clone(),
        batch_id,
        brand_slug,
        ..ProductDraft::new(request.name.clone(), creator)
    })
}
