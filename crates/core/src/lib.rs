//! `trustmark-core`: ids, revisions and validation shared by the ledger crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod revision;
pub mod slug;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ApplicationId, BatchId, BrandSlug, ProductId};
pub use revision::{ExpectedRevision, Revisioned};
pub use slug::slugify;
