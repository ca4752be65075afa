//! Entity trait: identity + continuity across state changes.

use crate::error::DomainError;

/// A record with a stable identity, stored under that identity in its own
/// collection.
pub trait Entity {
    /// Strongly-typed entity identifier (also the storage key).
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Human-readable kind, used in error messages ("product", "brand", ...).
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// The not-found error for this kind of entity.
    fn not_found() -> DomainError {
        DomainError::not_found(format!("{} not found", Self::KIND))
    }
}
