//! Ledger-level error model and the bounded retry used around transactions.

use std::future::Future;

use thiserror::Error;

use trustmark_auth::AuthzError;
use trustmark_core::DomainError;
use trustmark_products::Product;

use crate::store::StoreError;

/// Attempts a transactional read-modify-write gets before giving up.
pub const MAX_TRANSACTION_ATTEMPTS: usize = 5;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error returned by every ledger operation.
///
/// Domain errors are deterministic and never worth retrying. `Contention` and
/// `Transient` describe the store; callers may retry them.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("missing user")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A conditional write lost against a concurrent writer.
    #[error("write contention: {0}")]
    Contention(String),

    /// The store was unreachable, timed out, or contention persisted past the
    /// retry budget. The write may or may not have been applied.
    #[error("store temporarily unavailable: {0}")]
    Transient(String),

    /// A multi-edition creation failed part way. Editions in `created` are
    /// persisted; the remainder were not attempted.
    #[error("created {} of the requested editions: {cause}", created.len())]
    PartialBatch {
        created: Vec<Product>,
        cause: Box<LedgerError>,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transient(_) | LedgerError::Contention(_))
    }

    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::Unauthenticated => "unauthenticated",
            LedgerError::Forbidden(_) => "forbidden",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Contention(_) => "contention",
            LedgerError::Transient(_) => "transient",
            LedgerError::PartialBatch { .. } => "partial_batch",
            LedgerError::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::AlreadyExists(msg) => LedgerError::Conflict(msg),
            StoreError::Conflict(msg) => LedgerError::Contention(msg),
            StoreError::Missing(msg) => LedgerError::NotFound(msg),
            StoreError::Unavailable(msg) | StoreError::Timeout(msg) => LedgerError::Transient(msg),
            StoreError::Corrupt(_) => LedgerError::Store(value),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::Unauthenticated => LedgerError::Unauthenticated,
            DomainError::Forbidden(msg) => LedgerError::Forbidden(msg),
            DomainError::NotFound(msg) => LedgerError::NotFound(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
        }
    }
}

impl From<AuthzError> for LedgerError {
    fn from(value: AuthzError) -> Self {
        DomainError::from(value).into()
    }
}

/// Run `attempt` until it succeeds, fails with something other than
/// [`LedgerError::Contention`], or `max_attempts` is spent.
///
/// Timeouts and unavailability are returned as-is: a timed-out write may have
/// applied, so repeating it is the caller's decision.
pub async fn retry_on_conflict<T, F, Fut>(
    operation: &'static str,
    max_attempts: usize,
    mut attempt: F,
) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt().await {
            Err(LedgerError::Contention(msg)) => {
                tracing::debug!(operation, attempt = n, error = %msg, "transaction contention, retrying");
            }
            other => return other,
        }
    }
    tracing::warn!(operation, attempts = max_attempts, "transaction retry budget exhausted");
    Err(LedgerError::Transient(format!(
        "{operation}: contention persisted after {max_attempts} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn store_errors_map_to_ledger_kinds() {
        assert!(matches!(
            LedgerError::from(StoreError::AlreadyExists("x".into())),
            LedgerError::Conflict(_)
        ));
        assert!(LedgerError::from(StoreError::Conflict("x".into())).is_retryable());
        assert!(LedgerError::from(StoreError::Timeout("x".into())).is_retryable());
        assert!(!LedgerError::from(StoreError::Corrupt("x".into())).is_retryable());
        assert!(matches!(
            LedgerError::from(StoreError::Missing("x".into())),
            LedgerError::NotFound(_)
        ));
    }

    #[test]
    fn authz_errors_keep_their_message() {
        let err = LedgerError::from(AuthzError::Unauthenticated);
        assert_eq!(err.to_string(), "missing user");
        assert_eq!(err.code(), "unauthenticated");
        assert!(matches!(
            LedgerError::from(AuthzError::Forbidden("admin".into())),
            LedgerError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn contention_is_retried_until_success() {
        let calls = &AtomicUsize::new(0);
        let result = retry_on_conflict("test", MAX_TRANSACTION_ATTEMPTS, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::Contention("lost".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_is_transient() {
        let calls = &AtomicUsize::new(0);
        let result: LedgerResult<()> = retry_on_conflict("test", 3, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Contention("lost".into()))
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeouts_are_not_retried() {
        let calls = &AtomicUsize::new(0);
        let result: LedgerResult<()> = retry_on_conflict("test", 5, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Transient("deadline".into()))
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
