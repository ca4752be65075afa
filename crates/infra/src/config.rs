//! Process configuration, read once from the environment at startup.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `TRUSTMARK_DATABASE_URL` | Postgres URL; unset runs against the in-memory store | unset |
//! | `TRUSTMARK_PUBLIC_BASE` | prefix of product public URLs | `""` |
//! | `TRUSTMARK_STORE_TIMEOUT_MS` | per store call deadline, clamped to 1..=9999 | `5000` |
//! | `TRUSTMARK_ADMINS` | comma-separated administrator principals | empty |
//! | `TRUSTMARK_MANUFACTURERS` | comma-separated manufacturer principals | empty |
//! | `TRUSTMARK_DEFAULT_ADMIN` | principal seeded into the admin roster | unset |

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use trustmark_auth::{PrincipalId, StaticIdentityPolicy};

use crate::store::DEFAULT_STORE_TIMEOUT;

pub const ENV_DATABASE_URL: &str = "TRUSTMARK_DATABASE_URL";
pub const ENV_PUBLIC_BASE: &str = "TRUSTMARK_PUBLIC_BASE";
pub const ENV_STORE_TIMEOUT_MS: &str = "TRUSTMARK_STORE_TIMEOUT_MS";
pub const ENV_ADMINS: &str = "TRUSTMARK_ADMINS";
pub const ENV_MANUFACTURERS: &str = "TRUSTMARK_MANUFACTURERS";
pub const ENV_DEFAULT_ADMIN: &str = "TRUSTMARK_DEFAULT_ADMIN";

const MAX_STORE_TIMEOUT_MS: u64 = 9_999;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} contains an invalid principal '{value}'")]
    InvalidPrincipal { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerConfig {
    pub database_url: Option<String>,
    pub public_base: String,
    pub store_timeout_ms: u64,
    pub admins: Vec<PrincipalId>,
    pub manufacturers: Vec<PrincipalId>,
    pub default_admin: Option<PrincipalId>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            public_base: String::new(),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT.as_millis() as u64,
            admins: Vec::new(),
            manufacturers: Vec::new(),
            default_admin: None,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.database_url = get(ENV_DATABASE_URL);
        if let Some(base) = get(ENV_PUBLIC_BASE) {
            config.public_base = base.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get(ENV_STORE_TIMEOUT_MS) {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidTimeout {
                var: ENV_STORE_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config.store_timeout_ms = ms.clamp(1, MAX_STORE_TIMEOUT_MS);
        }
        if let Some(raw) = get(ENV_ADMINS) {
            config.admins = parse_principals(ENV_ADMINS, &raw)?;
        }
        if let Some(raw) = get(ENV_MANUFACTURERS) {
            config.manufacturers = parse_principals(ENV_MANUFACTURERS, &raw)?;
        }
        if let Some(raw) = get(ENV_DEFAULT_ADMIN) {
            config.default_admin = Some(parse_principal(ENV_DEFAULT_ADMIN, &raw)?);
        }
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms.clamp(1, MAX_STORE_TIMEOUT_MS))
    }

    pub fn identity_policy(&self) -> StaticIdentityPolicy {
        StaticIdentityPolicy::new()
            .with_admins(self.admins.iter().cloned())
            .with_manufacturers(self.manufacturers.iter().cloned())
    }
}

fn parse_principal(var: &'static str, raw: &str) -> Result<PrincipalId, ConfigError> {
    PrincipalId::parse(raw).map_err(|_| ConfigError::InvalidPrincipal {
        var,
        value: raw.to_string(),
    })
}

fn parse_principals(var: &'static str, raw: &str) -> Result<Vec<PrincipalId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_principal(var, s))
        .collect()
}
