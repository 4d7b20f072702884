use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::entitlement_entity;
pub use crate::entities::EntitlementSourceType;

pub const COHORT_CONTENT_ACCESS: &str = "cohort_content_access";
pub const WORKSHOP_CONTENT_ACCESS: &str = "workshop_content_access";
pub const CONTENT_ACCESS: &str = "content_access";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementMetadata {
    pub content_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub id: String,
    pub user_id: String,
    pub organization_id: Option<String>,
    pub organization_membership_id: Option<String>,
    pub entitlement_type: String,
    pub source_id: String,
    pub source_type: EntitlementSourceType,
    /// Natural key together with `source_id`.
    pub resource_id: String,
    pub metadata: EntitlementMetadata,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entitlement {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at.is_none() && self.expires_at.is_none_or(|exp| exp > now)
    }
}

impl TryFrom<entitlement_entity::Model> for Entitlement {
    type Error = serde_json::Error;

    fn try_from(m: entitlement_entity::Model) -> Result<Self, Self::Error> {
        let metadata: EntitlementMetadata = serde_json::from_value(m.metadata)?;
        Ok(Self {
            id: m.id,
            user_id: m.user_id,
            organization_id: m.organization_id,
            organization_membership_id: m.organization_membership_id,
            entitlement_type: m.entitlement_type,
            source_id: m.source_id,
            source_type: m.source_type,
            resource_id: m.resource_id,
            metadata,
            expires_at: m.expires_at,
            deleted_at: m.deleted_at,
            created_at: m.created_at,
        })
    }
}

/// Result of granting entitlements for one purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantOutcome {
    /// Ids of newly created entitlements.
    pub created: Vec<String>,
    /// Grants skipped because (sourceId, resourceId) already existed.
    pub skipped: usize,
}

impl GrantOutcome {
    pub fn merge(&mut self, other: GrantOutcome) {
        self.created.extend(other.created);
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeOutcome {
    pub purchase_id: String,
    pub revoked: u64,
}
