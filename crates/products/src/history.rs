//! Ownership audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustmark_auth::PrincipalId;
use trustmark_core::ProductId;

use crate::product::OwnershipTransfer;

/// One holding period of a product. `released_at == None` marks the current
/// holder; at most one such entry exists per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipHistoryEntry {
    pub token_id: ProductId,
    pub owner: PrincipalId,
    pub acquired_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl OwnershipHistoryEntry {
    pub fn open(token_id: ProductId, owner: PrincipalId, acquired_at: DateTime<Utc>) -> Self {
        Self {
            token_id,
            owner,
            acquired_at,
            released_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.released_at.is_none()
    }
}

/// Close the open entry of the transferred product (if any) and open one for
/// the new owner.
pub fn record_transfer(history: &mut Vec<OwnershipHistoryEntry>, transfer: &OwnershipTransfer) {
    for entry in history
        .iter_mut()
        .filter(|e| e.token_id == transfer.product_id && e.is_open())
    {
        entry.released_at = Some(transfer.at);
    }
    history.push(OwnershipHistoryEntry::open(
        transfer.product_id,
        transfer.to.clone(),
        transfer.at,
    ));
}

pub fn open_entries(history: &[OwnershipHistoryEntry], token_id: ProductId) -> usize {
    history
        .iter()
        .filter(|e| e.token_id == token_id && e.is_open())
        .count()
}
