use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustmark_auth::PrincipalId;
use trustmark_core::{BatchId, DomainResult, Entity};

use crate::serial::short_time_token;

/// A label grouping products created together. No lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,
    pub title: String,
    pub owner: PrincipalId,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// New batch; a blank title defaults to `Batch YYYY-MM-DD HH:MM`.
    pub fn new(title: Option<&str>, owner: PrincipalId, now: DateTime<Utc>) -> DomainResult<Self> {
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Batch {}", now.format("%Y-%m-%d %H:%M")),
        };
        Ok(Self {
            id: BatchId::from_token(&short_time_token(now))?,
            title,
            owner,
            created_at: now,
        })
    }
}

impl Entity for Batch {
    type Id = BatchId;
    const KIND: &'static str = "batch";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blank_title_gets_dated_default() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 5, 0).unwrap();
        let owner = PrincipalId::parse("maker@x.io").unwrap();
        let batch = Batch::new(Some("  "), owner.clone(), now).unwrap();
        assert_eq!(batch.title, "Batch 2024-06-01 08:05");
        assert_eq!(batch.id.as_str().len(), 6);

        let named = Batch::new(Some(" Spring run "), owner, now).unwrap();
        assert_eq!(named.title, "Spring run");
    }
}
