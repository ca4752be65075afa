//! `trustmark-auth`: principals, roles and the identity policy.
//!
//! Token verification happens upstream (an external identity provider). This
//! crate turns verified claims into a [`PrincipalId`], resolves the principal's
//! roles through an injected [`IdentityPolicy`], and provides the guards the
//! ledger components use. It is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, Requester, authorize};
pub use claims::{IdentityClaims, TokenValidationError, validate_claims};
pub use policy::{IdentityPolicy, StaticIdentityPolicy};
pub use principal::{AdminRecord, PrincipalId};
pub use roles::Role;
