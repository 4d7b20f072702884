use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::purchase_entity;
pub use crate::entities::PurchaseStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub organization_id: Option<String>,
    pub status: PurchaseStatus,
    /// This purchase owns a seat pool.
    pub bulk_coupon_id: Option<String>,
    /// This purchase is a seat taken from a pool.
    pub redeemed_bulk_coupon_id: Option<String>,
    pub merchant_charge_id: Option<String>,
    /// Region a restricted (PPP) purchase is valid in.
    pub country: Option<String>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<purchase_entity::Model> for Purchase {
    fn from(m: purchase_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            product_id: m.product_id,
            organization_id: m.organization_id,
            status: m.status,
            bulk_coupon_id: m.bulk_coupon_id,
            redeemed_bulk_coupon_id: m.redeemed_bulk_coupon_id,
            merchant_charge_id: m.merchant_charge_id,
            country: m.country,
            total_amount: m.total_amount,
            created_at: m.created_at,
        }
    }
}

/// `purchase` is the requested purchase if it belongs to the user; `existing_purchase`
/// is another valid purchase of the same product by that user.
#[derive(Debug, Clone, Default)]
pub struct PurchaseDetails {
    pub purchase: Option<Purchase>,
    pub existing_purchase: Option<Purchase>,
}
