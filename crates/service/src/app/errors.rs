//! Error outcomes: one stable status/code pair per ledger error kind.

use serde::Serialize;

use trustmark_infra::LedgerError;
use trustmark_products::Product;

/// Transport-neutral error outcome (HTTP-style status, short code, message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutcome {
    #[serde(skip)]
    pub status: u16,
    #[serde(rename = "error")]
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    /// Editions persisted before a batch failed; authoritative.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<Product>,
}

impl ErrorOutcome {
    fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retryable: false,
            created: Vec::new(),
        }
    }

    fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

pub fn ledger_error_to_outcome(err: LedgerError) -> ErrorOutcome {
    match err {
        LedgerError::Validation(msg) => ErrorOutcome::new(400, "validation_error", msg),
        LedgerError::Unauthenticated => ErrorOutcome::new(401, "unauthenticated", "missing user"),
        LedgerError::Forbidden(msg) => ErrorOutcome::new(403, "forbidden", msg),
        LedgerError::NotFound(msg) => ErrorOutcome::new(404, "not_found", msg),
        LedgerError::Conflict(msg) => ErrorOutcome::new(409, "conflict", msg),
        LedgerError::Contention(msg) => ErrorOutcome::new(409, "contention", msg).retryable(),
        LedgerError::Transient(msg) => ErrorOutcome::new(503, "transient", msg).retryable(),
        LedgerError::PartialBatch { created, cause } => {
            let mut outcome = ErrorOutcome::new(207, "partial_batch", cause.to_string());
            outcome.retryable = cause.is_retryable();
            outcome.created = created;
            outcome
        }
        LedgerError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            ErrorOutcome::new(500, "store_error", e.to_string())
        }
    }
}

impl From<LedgerError> for ErrorOutcome {
    fn from(err: LedgerError) -> Self {
        ledger_error_to_outcome(err)
    }
}
