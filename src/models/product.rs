use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use crate::entities::ProductType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[schema(value_type = String)]
    pub price: Decimal,
    /// -1 means unlimited
    pub quantity_available: i32,
    pub resource_ids: Vec<String>,
}

impl Product {
    pub fn has_unlimited_quantity(&self) -> bool {
        self.quantity_available < 0
    }
}
