//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::slug::slugify;

/// Identifier of a product record (the public "token id").
///
/// Assigned by the identifier allocator; strictly increasing, starting at 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Wrap a raw id. Zero is reserved for "not yet allocated" and rejected.
    pub fn new(raw: u64) -> Result<Self, DomainError> {
        if raw == 0 {
            return Err(DomainError::invalid_id("ProductId: must be >= 1"));
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id(format!("ProductId: {e}")))?;
        Self::new(raw)
    }
}

/// Identifier of a company application: an opaque random token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

/// Identifier of a batch label: a short token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

macro_rules! impl_token_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let token = s.trim();
                if token.is_empty() {
                    return Err(DomainError::invalid_id(concat!($name, ": empty token")));
                }
                if token.contains('/') {
                    return Err(DomainError::invalid_id(concat!($name, ": token contains '/'")));
                }
                Ok(Self(token.to_string()))
            }
        }
    };
}

impl_token_newtype!(ApplicationId, "ApplicationId");
impl_token_newtype!(BatchId, "BatchId");

impl ApplicationId {
    /// Random 64-bit token, lower-case hex.
    pub fn random() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}

impl BatchId {
    /// Batch ids are upper-cased so that user-entered references match.
    pub fn from_token(token: &str) -> Result<Self, DomainError> {
        let id: Self = token.parse()?;
        Ok(Self(id.0.to_uppercase()))
    }
}

/// Normalized brand key derived from a display name (see [`slugify`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandSlug(String);

impl BrandSlug {
    pub fn from_name(name: &str) -> Self {
        Self(slugify(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BrandSlug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsing re-normalizes, so `"aurora watch"` and `"AURORA-WATCH"` address
/// the same brand.
impl FromStr for BrandSlug {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(DomainError::invalid_id("BrandSlug: empty slug"));
        }
        Ok(Self::from_name(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_rejects_zero() {
        assert!(ProductId::new(0).is_err());
        assert_eq!(ProductId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn product_id_parses_decimal() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert!(matches!("abc".parse::<ProductId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<ProductId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn application_ids_are_random_hex() {
        let a = ApplicationId::random();
        let b = ApplicationId::random();
        assert_eq!(a.as_str().len(), 16);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn tokens_reject_empty_and_path_separators() {
        assert!("".parse::<ApplicationId>().is_err());
        assert!("ab/approve".parse::<ApplicationId>().is_err());
        assert_eq!(BatchId::from_token(" k3xq9z ").unwrap().as_str(), "K3XQ9Z");
    }

    #[test]
    fn brand_slugs_renormalize_on_parse() {
        let slug: BrandSlug = "aurora watch".parse().unwrap();
        assert_eq!(slug, BrandSlug::from_name("Aurora  Watch!"));
        assert_eq!(slug.as_str(), "AURORA-WATCH");
        assert!("  ".parse::<BrandSlug>().is_err());
    }
}
