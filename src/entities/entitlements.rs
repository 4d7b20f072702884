use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entitlement_source_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementSourceType {
    #[sea_orm(string_value = "PURCHASE")]
    Purchase,
    #[sea_orm(string_value = "SUBSCRIPTION")]
    Subscription,
}

impl std::fmt::Display for EntitlementSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntitlementSourceType::Purchase => write!(f, "PURCHASE"),
            EntitlementSourceType::Subscription => write!(f, "SUBSCRIPTION"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "entitlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub organization_id: Option<String>,
    pub organization_membership_id: Option<String>,
    pub entitlement_type: String,
    pub source_id: String,
    pub source_type: EntitlementSourceType,
    /// 幂等键的一部分: (source_id, resource_id) 唯一
    pub resource_id: String,
    /// {"contentIds": [...]}
    pub metadata: Json,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
