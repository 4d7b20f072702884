use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: Option<String>,
    pub percentage_discount: Decimal,
    pub amount_discount: Option<Decimal>,
    /// <= 0 表示不限次数
    pub max_uses: i32,
    pub used_count: i32,
    pub expires: Option<DateTime<Utc>>,
    pub restricted_to_product_id: Option<String>,
    pub is_default: bool,
    /// 团队券: 创建该券的批量购买记录
    pub bulk_purchase_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
