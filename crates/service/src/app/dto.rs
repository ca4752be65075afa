//! Request/response shapes. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use trustmark_auth::{AdminRecord, PrincipalId};
use trustmark_brands::{ApplicantDetails, ApplicationStatus, Brand, CompanyApplication};
use trustmark_core::ApplicationId;
use trustmark_products::{Batch, Product, ProductState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: Option<String>,
    pub manufactured_at: Option<String>,
    pub image: Option<String>,
    /// Number of editions; absent, zero or negative means a single product.
    pub edition_count: Option<i64>,
    pub certificates: Vec<String>,
    pub batch_id: Option<String>,
}

/// One product for a single creation, an array for an edition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CreatedProducts {
    One(Box<Product>),
    Many(Vec<Product>),
}

impl CreatedProducts {
    pub fn into_vec(self) -> Vec<Product> {
        match self {
            CreatedProducts::One(product) => vec![*product],
            CreatedProducts::Many(products) => products,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseResponse {
    pub ok: bool,
    pub state: ProductState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBrandRequest {
    pub name: String,
    /// Administrators may register a brand on behalf of another principal.
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationResponse {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
}

impl From<&CompanyApplication> for SubmitApplicationResponse {
    fn from(app: &CompanyApplication) -> Self {
        Self {
            id: app.id.clone(),
            status: app.status,
        }
    }
}

pub type SubmitApplicationRequest = ApplicantDetails;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecideRequest {
    /// `approve` or `reject`.
    pub action: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideResponse {
    pub ok: bool,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<Brand>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrantAdminRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminList {
    pub admins: Vec<AdminRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBatchRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchList {
    pub batches: Vec<Batch>,
}

/// Account summary of the calling principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub principal: PrincipalId,
    pub is_admin: bool,
    pub is_manufacturer: bool,
    pub brands: Vec<Brand>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_accepts_camel_case_and_missing_fields() {
        let req: CreateProductRequest = serde_json::from_value(json!({
            "name": "Aurora Watch",
            "editionCount": 3,
            "manufacturedAt": "2024-05-01"
        }))
        .unwrap();
        assert_eq!(req.edition_count, Some(3));
        assert_eq!(req.manufactured_at.as_deref(), Some("2024-05-01"));
        assert!(req.certificates.is_empty());
    }

    #[test]
    fn decide_response_omits_brand_on_reject() {
        let value = serde_json::to_value(DecideResponse {
            ok: true,
            status: ApplicationStatus::Rejected,
            brand: None,
        })
        .unwrap();
        assert_eq!(value, json!({"ok": true, "status": "rejected"}));
    }

    #[test]
    fn purchase_response_shape() {
        let value = serde_json::to_value(PurchaseResponse {
            ok: true,
            state: ProductState::Purchased,
        })
        .unwrap();
        assert_eq!(value, json!({"ok": true, "state": "purchased"}));
    }
}
