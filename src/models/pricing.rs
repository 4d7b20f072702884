use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::CouponError;

/// Where a rate (percentage-shaped) discount came from. Only one applies per price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Coupon,
    Ppp,
    Bulk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDiscount {
    pub source: RateSource,
    /// 0..=1
    pub rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    PercentageCoupon,
    Ppp,
    Bulk,
    FixedAmount,
    UpgradeCredit,
}

impl From<RateSource> for DiscountKind {
    fn from(source: RateSource) -> Self {
        match source {
            RateSource::Coupon => DiscountKind::PercentageCoupon,
            RateSource::Ppp => DiscountKind::Ppp,
            RateSource::Bulk => DiscountKind::Bulk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub kind: DiscountKind,
    /// Set for rate discounts.
    #[schema(value_type = Option<String>)]
    pub rate: Option<Decimal>,
    /// Amount taken off one unit, after clamping.
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceInput {
    pub base_price: Decimal,
    pub rate_discount: Option<RateDiscount>,
    pub fixed_discount: Option<Decimal>,
    pub upgrade_credit: Option<Decimal>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceCalculation {
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub final_unit_price: Decimal,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub applied_discounts: Vec<AppliedDiscount>,
}

impl PriceCalculation {
    pub fn has_discount(&self, kind: DiscountKind) -> bool {
        self.applied_discounts.iter().any(|d| d.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub product_id: String,
    pub applied_coupon_id: Option<String>,
    /// Why an entered coupon code was not used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_error: Option<CouponError>,
    pub country: Option<String>,
    #[serde(flatten)]
    pub calculation: PriceCalculation,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PriceQuery {
    pub coupon: Option<String>,
    pub quantity: Option<u32>,
    pub country: Option<String>,
    pub upgrade_from: Option<String>,
}

/// Everything `compute_price` needs about one pricing request.
#[derive(Debug, Clone, Default)]
pub struct PriceRequest {
    pub product_id: String,
    pub coupon_code: Option<String>,
    pub quantity: Option<u32>,
    pub country_code: Option<String>,
    pub upgrade_from_purchase_id: Option<String>,
    pub user_id: Option<String>,
}
