//! Persisted administrator roster.
//!
//! Membership is checked per request, so a grant takes effect on the next
//! call without a restart.

use chrono::Utc;
use tracing::instrument;

use trustmark_auth::{AdminRecord, PrincipalId};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{SharedStore, StoreError};

#[derive(Clone)]
pub struct AdminRoster {
    store: SharedStore,
}

impl AdminRoster {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Claim the first administrator seat. Fails once anyone holds one.
    #[instrument(skip(self), fields(principal = %principal), err)]
    pub async fn bootstrap(&self, principal: &PrincipalId) -> LedgerResult<AdminRecord> {
        let record = AdminRecord::new(principal.clone(), None, Utc::now());
        match self.store.create_first_admin(&record).await {
            Ok(stored) => {
                tracing::info!(principal = %stored.principal, "admin roster bootstrapped");
                Ok(stored)
            }
            Err(StoreError::AlreadyExists(_)) => Err(LedgerError::forbidden("already initialized")),
            Err(e) => Err(e.into()),
        }
    }

    /// Add `email` to the roster. Granting an existing admin is a no-op.
    #[instrument(skip(self), fields(granted_by = %granted_by), err)]
    pub async fn grant(&self, email: &str, granted_by: &PrincipalId) -> LedgerResult<AdminRecord> {
        if email.trim().is_empty() {
            return Err(LedgerError::validation("email required"));
        }
        let principal = PrincipalId::parse(email)?;
        let record = AdminRecord::new(principal, Some(granted_by.clone()), Utc::now());
        match self.store.create_admin(&record).await {
            Ok(stored) => {
                tracing::info!(principal = %stored.principal, "admin granted");
                Ok(stored)
            }
            Err(StoreError::AlreadyExists(_)) => {
                tracing::debug!(principal = %record.principal, "already an admin");
                self.store
                    .get_admin(&record.principal)
                    .await?
                    .ok_or_else(|| LedgerError::Transient(format!("admin {} vanished", record.principal)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, principal: &PrincipalId) -> LedgerResult<bool> {
        Ok(self.store.get_admin(principal).await?.is_some())
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> LedgerResult<Vec<AdminRecord>> {
        Ok(self.store.list_admins().await?)
    }

    /// Seed a configured default administrator, if absent.
    #[instrument(skip(self), fields(principal = %principal), err)]
    pub async fn ensure_default_admin(&self, principal: &PrincipalId) -> LedgerResult<()> {
        let record = AdminRecord::new(principal.clone(), None, Utc::now());
        match self.store.create_admin(&record).await {
            Ok(_) => {
                tracing::info!(principal = %principal, "default admin seeded");
                Ok(())
            }
            Err(StoreError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
