//! Postgres-backed ledger store.
//!
//! Each collection is a table keyed like its logical collection, with the
//! full record in a `record JSONB` column and the fields the store must query
//! or guard on (owner, status, revision) as plain columns.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Conflict` |
//! | Database (other) | Any other | `Unavailable` |
//! | Decode / ColumnDecode | N/A | `Corrupt` |
//! | PoolClosed / PoolTimedOut / Io / other | N/A | `Unavailable` |
//!
//! Conditional writes (`update_brand`, `update_application`) run as a single
//! `UPDATE ... WHERE revision = $n`; the transfer runs as one transaction
//! holding a row lock on the product.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use trustmark_auth::{AdminRecord, PrincipalId};
use trustmark_brands::{ApplicationStatus, Brand, CompanyApplication};
use trustmark_core::{ApplicationId, BrandSlug, ExpectedRevision, ProductId};
use trustmark_products::{Batch, OwnershipHistoryEntry, OwnershipTransfer, Product};

use super::r#trait::{
    AdminStore, ApplicationStore, BatchStore, BrandStore, CounterStore, ProductStore, StoreError,
};

const SCHEMA: &str = include_str!("../../sql/schema.sql");
const PRODUCT_COUNTER: &str = "products";

/// Postgres-backed ledger store. `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect a small pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn install_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("install_schema", e))?;
        Ok(())
    }

    async fn stored_revision(&self, table: &'static str, key_column: &'static str, key: &str) -> Result<Option<i64>, StoreError> {
        let sql = format!("SELECT revision FROM {table} WHERE {key_column} = $1");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stored_revision", e))?;
        row.map(|r| r.try_get::<i64, _>("revision"))
            .transpose()
            .map_err(|e| map_sqlx_error("stored_revision", e))
    }

    /// Classify a conditional update that touched no row.
    async fn lost_update(
        &self,
        table: &'static str,
        key_column: &'static str,
        key: &str,
        expected: ExpectedRevision,
    ) -> StoreError {
        match self.stored_revision(table, key_column, key).await {
            Ok(Some(actual)) => StoreError::Conflict(format!(
                "{table} {key}: expected {expected:?}, found {actual}"
            )),
            Ok(None) => StoreError::Missing(format!("{table} {key}")),
            Err(e) => e,
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists(msg),
                Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {operation}: {err}"))
        }
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {operation}")),
        sqlx::Error::PoolTimedOut => StoreError::Unavailable(format!("connection pool timed out in {operation}")),
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(format!("encode failed: {e}")))
}

fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<T, StoreError> {
    let record: serde_json::Value = row
        .try_get("record")
        .map_err(|e| map_sqlx_error("decode_record", e))?;
    serde_json::from_value(record).map_err(|e| StoreError::Corrupt(format!("decode failed: {e}")))
}

fn revision_of(row: &PgRow) -> Result<u64, StoreError> {
    let raw: i64 = row
        .try_get("revision")
        .map_err(|e| map_sqlx_error("decode_revision", e))?;
    u64::try_from(raw).map_err(|_| StoreError::Corrupt(format!("negative revision {raw}")))
}

fn to_db(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{value} exceeds BIGINT")))
}

fn expected_db(expected: ExpectedRevision) -> Result<Option<i64>, StoreError> {
    match expected {
        ExpectedRevision::Any => Ok(None),
        ExpectedRevision::Exact(v) => to_db(v).map(Some),
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let mut product: Product = decode(row)?;
    product.revision = revision_of(row)?;
    Ok(product)
}

fn brand_from_row(row: &PgRow) -> Result<Brand, StoreError> {
    let mut brand: Brand = decode(row)?;
    brand.revision = revision_of(row)?;
    Ok(brand)
}

fn application_from_row(row: &PgRow) -> Result<CompanyApplication, StoreError> {
    let mut application: CompanyApplication = decode(row)?;
    application.revision = revision_of(row)?;
    Ok(application)
}

#[async_trait::async_trait]
impl CounterStore for PostgresLedgerStore {
    #[instrument(skip(self), err)]
    async fn read_counter(&self) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT value FROM counters WHERE name = $1")
            .bind(PRODUCT_COUNTER)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("read_counter", e))?;
        match row {
            None => Ok(None),
            Some(row) => {
                let value: i64 = row.try_get("value").map_err(|e| map_sqlx_error("read_counter", e))?;
                u64::try_from(value)
                    .map(Some)
                    .map_err(|_| StoreError::Corrupt(format!("counter value {value}")))
            }
        }
    }

    #[instrument(skip(self), err)]
    async fn create_counter(&self, initial: u64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO counters (name, value) VALUES ($1, $2)")
            .bind(PRODUCT_COUNTER)
            .bind(to_db(initial)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_counter", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn swap_counter(&self, current: u64, next: u64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE counters SET value = $3 WHERE name = $1 AND value = $2")
            .bind(PRODUCT_COUNTER)
            .bind(to_db(current)?)
            .bind(to_db(next)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("swap_counter", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("counter moved past {current}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductStore for PostgresLedgerStore {
    #[instrument(skip(self, product), fields(product_id = %product.token_id), err)]
    async fn create_product(&self, product: &Product) -> Result<Product, StoreError> {
        let mut stored = product.clone();
        stored.revision = 1;
        sqlx::query("INSERT INTO products (token_id, owner, revision, record) VALUES ($1, $2, 1, $3)")
            .bind(to_db(stored.token_id.get())?)
            .bind(stored.owner.as_str())
            .bind(encode(&stored)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;
        Ok(stored)
    }

    #[instrument(skip(self, product), fields(product_id = %product.token_id), err)]
    async fn overwrite_product(&self, product: &Product) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (token_id, owner, revision, record)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (token_id) DO UPDATE SET
                owner = EXCLUDED.owner,
                record = EXCLUDED.record,
                revision = products.revision + 1
            RETURNING revision
            "#,
        )
        .bind(to_db(product.token_id.get())?)
        .bind(product.owner.as_str())
        .bind(encode(product)?)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("overwrite_product", e))?;

        let mut stored = product.clone();
        stored.revision = revision_of(&row)?;
        Ok(stored)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT revision, record FROM products WHERE token_id = $1")
            .bind(to_db(id.get())?)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn list_products_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT revision, record FROM products WHERE owner = $1")
            .bind(owner.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products_by_owner", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(
        skip(self, transfer),
        fields(product_id = %transfer.product_id, buyer = %transfer.to),
        err
    )]
    async fn commit_transfer(&self, transfer: &OwnershipTransfer) -> Result<Product, StoreError> {
        let token_id = to_db(transfer.product_id.get())?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT revision, record FROM products WHERE token_id = $1 FOR UPDATE")
            .bind(token_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        let Some(row) = row else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Missing(format!("product {}", transfer.product_id)));
        };

        let mut product = product_from_row(&row)?;
        if !transfer.expected.matches(product.revision) {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Conflict(format!(
                "product {}: expected {:?}, found {}",
                transfer.product_id, transfer.expected, product.revision
            )));
        }

        product.apply_transfer(transfer);
        product.revision += 1;

        sqlx::query("UPDATE products SET owner = $2, revision = $3, record = $4 WHERE token_id = $1")
            .bind(token_id)
            .bind(product.owner.as_str())
            .bind(to_db(product.revision)?)
            .bind(encode(&product)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_owner", e))?;

        sqlx::query(
            "UPDATE ownership_history SET released_at = $2 WHERE token_id = $1 AND released_at IS NULL",
        )
        .bind(token_id)
        .bind(transfer.at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("close_history", e))?;

        sqlx::query("INSERT INTO ownership_history (token_id, owner, acquired_at) VALUES ($1, $2, $3)")
            .bind(token_id)
            .bind(transfer.to.as_str())
            .bind(transfer.at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match map_sqlx_error("open_history", e) {
                // A concurrent holder entry slipped in: treat as a lost race.
                StoreError::AlreadyExists(msg) => StoreError::Conflict(msg),
                other => other,
            })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn ownership_history(&self, id: ProductId) -> Result<Vec<OwnershipHistoryEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT owner, acquired_at, released_at
            FROM ownership_history
            WHERE token_id = $1
            ORDER BY acquired_at ASC, id ASC
            "#,
        )
        .bind(to_db(id.get())?)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ownership_history", e))?;

        rows.iter()
            .map(|row| {
                let owner: String = row.try_get("owner").map_err(|e| map_sqlx_error("ownership_history", e))?;
                let acquired_at: DateTime<Utc> = row
                    .try_get("acquired_at")
                    .map_err(|e| map_sqlx_error("ownership_history", e))?;
                let released_at: Option<DateTime<Utc>> = row
                    .try_get("released_at")
                    .map_err(|e| map_sqlx_error("ownership_history", e))?;
                let owner = PrincipalId::parse(&owner)
                    .map_err(|e| StoreError::Corrupt(format!("history owner: {e}")))?;
                Ok(OwnershipHistoryEntry {
                    token_id: id,
                    owner,
                    acquired_at,
                    released_at,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl BrandStore for PostgresLedgerStore {
    #[instrument(skip(self, brand), fields(slug = %brand.slug), err)]
    async fn create_brand(&self, brand: &Brand) -> Result<Brand, StoreError> {
        let mut stored = brand.clone();
        stored.revision = 1;
        sqlx::query(
            "INSERT INTO brands (slug, owner, created_at, revision, record) VALUES ($1, $2, $3, 1, $4)",
        )
        .bind(stored.slug.as_str())
        .bind(stored.owner.as_str())
        .bind(stored.created_at)
        .bind(encode(&stored)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_brand", e))?;
        Ok(stored)
    }

    #[instrument(skip(self), fields(slug = %slug), err)]
    async fn get_brand(&self, slug: &BrandSlug) -> Result<Option<Brand>, StoreError> {
        let row = sqlx::query("SELECT revision, record FROM brands WHERE slug = $1")
            .bind(slug.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_brand", e))?;
        row.as_ref().map(brand_from_row).transpose()
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn list_brands_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Brand>, StoreError> {
        let rows = sqlx::query(
            "SELECT revision, record FROM brands WHERE owner = $1 ORDER BY created_at ASC, slug ASC",
        )
        .bind(owner.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_brands_by_owner", e))?;
        rows.iter().map(brand_from_row).collect()
    }

    #[instrument(skip(self, brand), fields(slug = %brand.slug, expected = ?expected), err)]
    async fn update_brand(&self, brand: &Brand, expected: ExpectedRevision) -> Result<Brand, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE brands SET record = $2, owner = $3, revision = revision + 1
            WHERE slug = $1 AND ($4::BIGINT IS NULL OR revision = $4)
            RETURNING revision
            "#,
        )
        .bind(brand.slug.as_str())
        .bind(encode(brand)?)
        .bind(brand.owner.as_str())
        .bind(expected_db(expected)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_brand", e))?;

        match row {
            Some(row) => Ok(Brand {
                revision: revision_of(&row)?,
                ..brand.clone()
            }),
            None => Err(self.lost_update("brands", "slug", brand.slug.as_str(), expected).await),
        }
    }
}

#[async_trait::async_trait]
impl ApplicationStore for PostgresLedgerStore {
    #[instrument(skip(self, application), fields(application_id = %application.id), err)]
    async fn create_application(
        &self,
        application: &CompanyApplication,
    ) -> Result<CompanyApplication, StoreError> {
        let mut stored = application.clone();
        stored.revision = 1;
        sqlx::query(
            r#"
            INSERT INTO company_applications (id, status, created_at, revision, record)
            VALUES ($1, $2, $3, 1, $4)
            "#,
        )
        .bind(stored.id.as_str())
        .bind(stored.status.as_str())
        .bind(stored.created_at)
        .bind(encode(&stored)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_application", e))?;
        Ok(stored)
    }

    #[instrument(skip(self), fields(application_id = %id), err)]
    async fn get_application(&self, id: &ApplicationId) -> Result<Option<CompanyApplication>, StoreError> {
        let row = sqlx::query("SELECT revision, record FROM company_applications WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_application", e))?;
        row.as_ref().map(application_from_row).transpose()
    }

    #[instrument(skip(self), fields(status = %status), err)]
    async fn list_applications(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<CompanyApplication>, StoreError> {
        let rows = sqlx::query(
            "SELECT revision, record FROM company_applications WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_applications", e))?;
        rows.iter().map(application_from_row).collect()
    }

    #[instrument(
        skip(self, application),
        fields(application_id = %application.id, status = %application.status, expected = ?expected),
        err
    )]
    async fn update_application(
        &self,
        application: &CompanyApplication,
        expected: ExpectedRevision,
    ) -> Result<CompanyApplication, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE company_applications SET status = $2, record = $3, revision = revision + 1
            WHERE id = $1 AND ($4::BIGINT IS NULL OR revision = $4)
            RETURNING revision
            "#,
        )
        .bind(application.id.as_str())
        .bind(application.status.as_str())
        .bind(encode(application)?)
        .bind(expected_db(expected)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_application", e))?;

        match row {
            Some(row) => Ok(CompanyApplication {
                revision: revision_of(&row)?,
                ..application.clone()
            }),
            None => Err(self
                .lost_update("company_applications", "id", application.id.as_str(), expected)
                .await),
        }
    }
}

#[async_trait::async_trait]
impl AdminStore for PostgresLedgerStore {
    #[instrument(skip(self, record), fields(principal = %record.principal), err)]
    async fn create_first_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Serializes concurrent bootstraps; readers are not blocked.
        sqlx::query("LOCK TABLE admins IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_admins", e))?;

        let initialized: bool = sqlx::query("SELECT EXISTS (SELECT 1 FROM admins) AS initialized")
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("initialized"))
            .map_err(|e| map_sqlx_error("count_admins", e))?;
        if initialized {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::AlreadyExists("admin roster already initialized".to_string()));
        }

        sqlx::query("INSERT INTO admins (principal, record) VALUES ($1, $2)")
            .bind(record.principal.as_str())
            .bind(encode(record)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_admin", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(record.clone())
    }

    #[instrument(skip(self, record), fields(principal = %record.principal), err)]
    async fn create_admin(&self, record: &AdminRecord) -> Result<AdminRecord, StoreError> {
        sqlx::query("INSERT INTO admins (principal, record) VALUES ($1, $2)")
            .bind(record.principal.as_str())
            .bind(encode(record)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_admin", e))?;
        Ok(record.clone())
    }

    #[instrument(skip(self), fields(principal = %principal), err)]
    async fn get_admin(&self, principal: &PrincipalId) -> Result<Option<AdminRecord>, StoreError> {
        let row = sqlx::query("SELECT record FROM admins WHERE principal = $1")
            .bind(principal.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_admin", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_admins(&self) -> Result<Vec<AdminRecord>, StoreError> {
        let rows = sqlx::query("SELECT record FROM admins ORDER BY principal ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_admins", e))?;
        rows.iter().map(decode).collect()
    }
}

#[async_trait::async_trait]
impl BatchStore for PostgresLedgerStore {
    #[instrument(skip(self, batch), fields(batch_id = %batch.id), err)]
    async fn create_batch(&self, batch: &Batch) -> Result<Batch, StoreError> {
        sqlx::query("INSERT INTO batches (id, owner, created_at, record) VALUES ($1, $2, $3, $4)")
            .bind(batch.id.as_str())
            .bind(batch.owner.as_str())
            .bind(batch.created_at)
            .bind(encode(batch)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_batch", e))?;
        Ok(batch.clone())
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn list_batches_by_owner(&self, owner: &PrincipalId) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query("SELECT record FROM batches WHERE owner = $1 ORDER BY created_at DESC")
            .bind(owner.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_batches_by_owner", e))?;
        rows.iter().map(decode).collect()
    }
}
