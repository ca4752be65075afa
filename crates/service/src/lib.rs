//! Ledger service boundary: request context, request/response shapes, error
//! outcomes, and the `LedgerService` facade the transports call.

pub mod app;
pub mod context;
