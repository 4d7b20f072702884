use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{organization_entity, organization_membership_entity, user_entity};
pub use crate::entities::MembershipRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: String,
    pub name: Option<String>,
}

impl From<organization_entity::Model> for Organization {
    fn from(m: organization_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembership {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub role: MembershipRole,
    pub created_at: DateTime<Utc>,
}

impl From<organization_membership_entity::Model> for OrganizationMembership {
    fn from(m: organization_membership_entity::Model) -> Self {
        Self {
            id: m.id,
            organization_id: m.organization_id,
            user_id: m.user_id,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Contributor,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub roles: Vec<UserRole>,
}

impl User {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}

impl From<user_entity::Model> for User {
    fn from(m: user_entity::Model) -> Self {
        // 未知角色直接忽略
        let roles = match m.roles {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value::<UserRole>(v).ok())
                .collect(),
            _ => Vec::new(),
        };
        Self { id: m.id, roles }
    }
}
