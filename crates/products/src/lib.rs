//! Products domain module.
//!
//! Product records, their ownership state machine and audit trail, serials and
//! fingerprints, and the requester-scoped verification view. Pure
//! deterministic logic (no IO, no storage).

pub mod batch;
pub mod history;
pub mod product;
pub mod serial;
pub mod verification;

pub use batch::Batch;
pub use history::{OwnershipHistoryEntry, open_entries, record_transfer};
pub use product::{
    MAX_EDITIONS, METADATA_VERSION, OwnershipTransfer, Product, ProductDraft, ProductMetadata, ProductState,
    public_url,
};
pub use serial::{Edition, content_fingerprint, serial_fingerprint, sha256_hex};
pub use verification::{VerificationScope, VerificationView, project};
