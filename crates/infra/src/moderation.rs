//! Company application moderation.
//!
//! ```text
//! submit ──► pending ──approve──► approved   (brand created + verified first)
//!               │
//!               └────reject────► rejected
//! ```
//!
//! The status write is conditional on the revision that was read while the
//! application was still pending. A decide that loses the race re-reads; if
//! the winner already moved the application out of pending it fails with
//! "already processed".
//!
//! The brand side effects of an approval are applied before the status write
//! and are not undone if a concurrent reject wins that write.

use chrono::Utc;
use tracing::instrument;

use trustmark_auth::PrincipalId;
use trustmark_brands::{ApplicantDetails, ApplicationStatus, Brand, CompanyApplication, Decision};
use trustmark_core::{ApplicationId, Entity, Revisioned};

use crate::brands::BrandRegistry;
use crate::error::{LedgerResult, MAX_TRANSACTION_ATTEMPTS, retry_on_conflict};
use crate::store::SharedStore;

/// Result of deciding an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub application: CompanyApplication,
    /// The verified brand, for approvals.
    pub brand: Option<Brand>,
}

#[derive(Clone)]
pub struct Moderation {
    store: SharedStore,
    brands: BrandRegistry,
}

impl Moderation {
    pub fn new(store: SharedStore, brands: BrandRegistry) -> Self {
        Self { store, brands }
    }

    #[instrument(skip(self, details), fields(applicant = %applicant), err)]
    pub async fn submit(
        &self,
        applicant: &PrincipalId,
        details: ApplicantDetails,
    ) -> LedgerResult<CompanyApplication> {
        let application =
            CompanyApplication::submit(ApplicationId::random(), applicant.clone(), details, Utc::now())?;
        let stored = self.store.create_application(&application).await?;
        tracing::info!(application_id = %stored.id, brand = %stored.details.brand_name, "application submitted");
        Ok(stored)
    }

    #[instrument(skip(self), fields(application_id = %id), err)]
    pub async fn get(&self, id: &ApplicationId) -> LedgerResult<CompanyApplication> {
        self.store
            .get_application(id)
            .await?
            .ok_or_else(|| CompanyApplication::not_found().into())
    }

    /// Applications in `status`, newest first.
    #[instrument(skip(self), fields(status = %status), err)]
    pub async fn list(&self, status: ApplicationStatus) -> LedgerResult<Vec<CompanyApplication>> {
        Ok(self.store.list_applications(status).await?)
    }

    #[instrument(skip(self, decision), fields(application_id = %id, reviewer = %reviewer), err)]
    pub async fn decide(
        &self,
        id: &ApplicationId,
        decision: &Decision,
        reviewer: &PrincipalId,
    ) -> LedgerResult<DecisionOutcome> {
        let application = self.get(id).await?;
        application.ensure_pending()?;

        let brand = match decision {
            Decision::Approve => {
                let owner = application.contact()?;
                let brand = self.brands.create(&application.details.brand_name, &owner).await?;
                Some(self.brands.verify(&brand.slug, reviewer).await?)
            }
            Decision::Reject { .. } => None,
        };

        let application = retry_on_conflict("decide_application", MAX_TRANSACTION_ATTEMPTS, move || {
            self.try_record_decision(id, decision, reviewer)
        })
        .await?;

        tracing::info!(application_id = %application.id, status = %application.status, "application decided");
        Ok(DecisionOutcome { application, brand })
    }

    /// Re-read and write the decision only if the application is still at
    /// the revision that was read.
    async fn try_record_decision(
        &self,
        id: &ApplicationId,
        decision: &Decision,
        reviewer: &PrincipalId,
    ) -> LedgerResult<CompanyApplication> {
        let mut current = self.get(id).await?;
        let expected = current.expected();
        current.decide(decision, reviewer, Utc::now())?;
        Ok(self.store.update_application(&current, expected).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::LedgerError;
    use crate::store::InMemoryLedgerStore;

    fn p(s: &str) -> PrincipalId {
        PrincipalId::parse(s).unwrap()
    }

    fn moderation() -> Moderation {
        let store: SharedStore = Arc::new(InMemoryLedgerStore::new());
        Moderation::new(store.clone(), BrandRegistry::new(store))
    }

    fn details(brand: &str, contact: &str) -> ApplicantDetails {
        ApplicantDetails {
            brand_name: brand.to_string(),
            contact_email: contact.to_string(),
            ..ApplicantDetails::default()
        }
    }

    #[tokio::test]
    async fn submit_requires_brand_and_contact() {
        let err = moderation()
            .submit(&p("applicant@example.com"), details("", "x@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ref m) if m == "brandName and contactEmail required"));
    }

    #[tokio::test]
    async fn reject_records_reason_and_reviewer() {
        let moderation = moderation();
        let app = moderation
            .submit(&p("applicant@example.com"), details("Fjord Co", "Owner@Fjord.example"))
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.details.contact_email, "owner@fjord.example");

        let decision = Decision::Reject {
            reason: Some("no proof".to_string()),
        };
        let outcome = moderation.decide(&app.id, &decision, &p("admin@example.com")).await.unwrap();
        assert_eq!(outcome.application.status, ApplicationStatus::Rejected);
        assert_eq!(outcome.application.reason.as_deref(), Some("no proof"));
        assert_eq!(outcome.application.reviewed_by, Some(p("admin@example.com")));
        assert!(outcome.brand.is_none());

        assert!(moderation.list(ApplicationStatus::Pending).await.unwrap().is_empty());
        assert_eq!(moderation.list(ApplicationStatus::Rejected).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deciding_unknown_application_is_not_found() {
        let id: ApplicationId = "deadbeef".parse().unwrap();
        let err = moderation()
            .decide(&id, &Decision::Approve, &p("admin@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(ref m) if m == "application not found"));
    }
}
