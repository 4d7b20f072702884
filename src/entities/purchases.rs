use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "purchase_status")]
pub enum PurchaseStatus {
    #[sea_orm(string_value = "Valid")]
    Valid,
    #[sea_orm(string_value = "Restricted")]
    Restricted,
    #[sea_orm(string_value = "Refunded")]
    Refunded,
    #[sea_orm(string_value = "Disputed")]
    Disputed,
}

impl PurchaseStatus {
    /// Refunded and disputed purchases never grant access.
    pub fn grants_access(&self) -> bool {
        matches!(self, PurchaseStatus::Valid | PurchaseStatus::Restricted)
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseStatus::Valid => write!(f, "Valid"),
            PurchaseStatus::Restricted => write!(f, "Restricted"),
            PurchaseStatus::Refunded => write!(f, "Refunded"),
            PurchaseStatus::Disputed => write!(f, "Disputed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub organization_id: Option<String>,
    pub status: PurchaseStatus,
    pub bulk_coupon_id: Option<String>,
    pub redeemed_bulk_coupon_id: Option<String>,
    pub merchant_charge_id: Option<String>,
    pub country: Option<String>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
