//! Service wiring.
//!
//! - `services.rs`: the `LedgerService` facade (store selection, authorization, operations)
//! - `dto.rs`: request/response shapes, camelCase JSON at the boundary
//! - `errors.rs`: consistent error outcomes

pub mod dto;
pub mod errors;
pub mod services;

pub use errors::{ErrorOutcome, ledger_error_to_outcome};
pub use services::{LedgerService, ServiceError};
