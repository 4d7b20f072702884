use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::coupon_entity;
use crate::models::Purchase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub code: Option<String>,
    /// 0..=1
    #[schema(value_type = String)]
    pub percentage_discount: Decimal,
    #[schema(value_type = Option<String>)]
    pub amount_discount: Option<Decimal>,
    /// <= 0 means unlimited
    pub max_uses: i32,
    pub used_count: i32,
    pub expires: Option<DateTime<Utc>>,
    pub restricted_to_product_id: Option<String>,
    pub default: bool,
    /// Set on seat pools: the bulk purchase that created this coupon.
    pub bulk_purchase_id: Option<String>,
}

impl Coupon {
    /// `amount_discount > 0` takes precedence over the percentage.
    pub fn is_fixed_type(&self) -> bool {
        self.amount_discount.is_some_and(|a| a > Decimal::ZERO)
    }

    pub fn is_bulk(&self) -> bool {
        self.bulk_purchase_id.is_some()
    }

    pub fn number_of_redemptions_left(&self) -> i32 {
        self.max_uses - self.used_count
    }

    pub fn has_redemptions_left(&self) -> bool {
        self.max_uses > self.used_count
    }
}

impl From<coupon_entity::Model> for Coupon {
    fn from(m: coupon_entity::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            percentage_discount: m.percentage_discount,
            amount_discount: m.amount_discount,
            max_uses: m.max_uses,
            used_count: m.used_count,
            expires: m.expires,
            restricted_to_product_id: m.restricted_to_product_id,
            default: m.is_default,
            bulk_purchase_id: m.bulk_purchase_id,
        }
    }
}

/// A seat-pool coupon together with the purchases that own it.
#[derive(Debug, Clone)]
pub struct CouponWithBulkPurchases {
    pub coupon: Coupon,
    pub bulk_purchases: Vec<Purchase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CouponError {
    CouponNotFound,
    CouponNotValidForProduct,
    /// The remaining variants are only reported in price breakdowns.
    CouponExpired,
    CouponUsedUp,
    CouponNotRedeemable,
}

impl std::fmt::Display for CouponError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponError::CouponNotFound => write!(f, "coupon-not-found"),
            CouponError::CouponNotValidForProduct => write!(f, "coupon-not-valid-for-product"),
            CouponError::CouponExpired => write!(f, "coupon-expired"),
            CouponError::CouponUsedUp => write!(f, "coupon-used-up"),
            CouponError::CouponNotRedeemable => write!(f, "coupon-not-redeemable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub is_valid: bool,
    pub is_redeemable: bool,
    pub is_expired: bool,
    pub is_used_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CouponError>,
}

impl CouponValidation {
    pub fn rejected(error: CouponError) -> Self {
        Self {
            is_valid: false,
            is_redeemable: false,
            is_expired: false,
            is_used_up: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    pub product_ids: Vec<String>,
}
