//! Transactional document store abstraction and its backends.
//!
//! - [`InMemoryLedgerStore`]: single-lock store for tests and local runs.
//! - [`PostgresLedgerStore`]: sqlx/Postgres backend.
//! - [`DeadlineStore`]: adapter bounding every call by a timeout.

pub mod r#trait;
pub mod in_memory;
pub mod deadline;
pub mod postgres;

pub use deadline::{DEFAULT_STORE_TIMEOUT, DeadlineStore};
pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{
    AdminStore, ApplicationStore, BatchStore, BrandStore, CounterStore, LedgerStore, ProductStore,
    SharedStore, StoreError,
};
