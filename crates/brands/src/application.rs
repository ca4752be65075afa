use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustmark_auth::PrincipalId;
use trustmark_core::{ApplicationId, DomainError, DomainResult, Entity, Revisioned};

/// Company application moderation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl core::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// Moderator decision on a pending application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: Option<String> },
}

impl Decision {
    /// Parse an action (`approve` / `reject`) and optional reason.
    pub fn parse(action: &str, reason: Option<&str>) -> DomainResult<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject {
                reason: reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string),
            }),
            other => Err(DomainError::validation(format!(
                "action must be approve or reject, got '{other}'"
            ))),
        }
    }

    pub fn target_status(&self) -> ApplicationStatus {
        match self {
            Decision::Approve => ApplicationStatus::Approved,
            Decision::Reject { .. } => ApplicationStatus::Rejected,
        }
    }
}

/// Applicant-supplied fields. Only brand name and contact e-mail are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicantDetails {
    pub full_name: String,
    pub contact_email: String,
    pub legal_name: String,
    pub brand_name: String,
    pub country: String,
    pub vat: String,
    pub reg_number: String,
    pub site: String,
    pub phone: String,
    pub address: String,
    /// Proof-of-identity reference (URL).
    pub proof_url: String,
    /// Proof-of-identity reference (storage path).
    pub proof_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyApplication {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub details: ApplicantDetails,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_by: PrincipalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<PrincipalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl CompanyApplication {
    /// Intake: validate and normalize, producing a pending application.
    pub fn submit(
        id: ApplicationId,
        applicant: PrincipalId,
        mut details: ApplicantDetails,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        details.brand_name = details.brand_name.trim().to_string();
        details.contact_email = details.contact_email.trim().to_lowercase();
        if details.brand_name.is_empty() || details.contact_email.is_empty() {
            return Err(DomainError::validation("brandName and contactEmail required"));
        }
        PrincipalId::parse(&details.contact_email)
            .map_err(|_| DomainError::validation("contactEmail is not a valid identity"))?;

        Ok(Self {
            id,
            details,
            status: ApplicationStatus::Pending,
            reason: None,
            created_by: applicant,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }

    /// The principal that will own the brand on approval.
    pub fn contact(&self) -> DomainResult<PrincipalId> {
        PrincipalId::parse(&self.details.contact_email)
    }

    pub fn ensure_pending(&self) -> DomainResult<()> {
        match self.status {
            ApplicationStatus::Pending => Ok(()),
            ApplicationStatus::Approved | ApplicationStatus::Rejected => {
                Err(DomainError::conflict("already processed"))
            }
        }
    }

    /// Apply a decision. Only `pending` applications accept one.
    pub fn decide(
        &mut self,
        decision: &Decision,
        reviewer: &PrincipalId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_pending()?;
        self.status = decision.target_status();
        self.reason = match decision {
            Decision::Approve => None,
            Decision::Reject { reason } => reason.clone(),
        };
        self.reviewed_by = Some(reviewer.clone());
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for CompanyApplication {
    type Id = ApplicationId;
    const KIND: &'static str = "application";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Revisioned for CompanyApplication {
    fn revision(&self) -> u64 {
        self.revision
    }
}
