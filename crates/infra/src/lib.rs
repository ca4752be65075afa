//! Ledger infrastructure: the transactional store and the components that
//! run the product lifecycle against it.
//!
//! Every component holds a [`SharedStore`](store::SharedStore) and is cheap to
//! clone. Cross-request consistency comes from the store's create-if-absent
//! and revision-guarded writes; nothing here keeps mutable state of its own.

pub mod admins;
pub mod allocator;
pub mod batches;
pub mod brands;
pub mod config;
pub mod error;
pub mod moderation;
pub mod products;
pub mod store;
pub mod transfer;

mod integration_tests;

pub use admins::AdminRoster;
pub use allocator::IdAllocator;
pub use batches::Batches;
pub use brands::BrandRegistry;
pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult, MAX_TRANSACTION_ATTEMPTS, retry_on_conflict};
pub use moderation::{DecisionOutcome, Moderation};
pub use products::ProductRecords;
pub use transfer::OwnershipTransfers;
