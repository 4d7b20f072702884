use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "product_type")]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    #[sea_orm(string_value = "self-paced")]
    SelfPaced,
    #[sea_orm(string_value = "live")]
    Live,
    #[sea_orm(string_value = "cohort")]
    Cohort,
    #[sea_orm(string_value = "membership")]
    Membership,
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::SelfPaced => write!(f, "self-paced"),
            ProductType::Live => write!(f, "live"),
            ProductType::Cohort => write!(f, "cohort"),
            ProductType::Membership => write!(f, "membership"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub product_type: ProductType,
    pub price: Decimal,
    /// -1 表示不限量
    pub quantity_available: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
