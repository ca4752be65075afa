//! Record revisions and optimistic concurrency expectations.

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// A stored record that carries a revision counter.
///
/// The store bumps the revision on every successful conditional write, so a
/// writer that read revision `n` can ask for its write to apply only if the
/// record is still at `n`.
pub trait Revisioned: Entity {
    /// Monotonically increasing revision of the stored record (0 = never written).
    fn revision(&self) -> u64;

    /// The expectation a read-modify-write should carry for this record.
    fn expected(&self) -> ExpectedRevision {
        ExpectedRevision::Exact(self.revision())
    }
}

/// Optimistic concurrency expectation for a conditional write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip revision checking (blind overwrite).
    Any,
    /// Require the stored record to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_only_same_revision() {
        assert!(ExpectedRevision::Exact(3).matches(3));
        assert!(!ExpectedRevision::Exact(3).matches(4));
        assert!(ExpectedRevision::Any.matches(99));
        assert!(matches!(
            ExpectedRevision::Exact(1).check(2),
            Err(DomainError::Conflict(_))
        ));
    }
}
