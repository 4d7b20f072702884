use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{Coupon, CouponError, CouponValidation};

/// Smallest percentage that makes a coupon redeemable.
const MIN_REDEEMABLE_PERCENTAGE: Decimal = dec!(0.01);

/// 校验优惠券: 未找到 / 不适用于商品 / 已用完 / 已过期
pub fn validate_coupon(
    coupon: Option<&Coupon>,
    product_ids: &[String],
    now: DateTime<Utc>,
) -> CouponValidation {
    let Some(coupon) = coupon else {
        return CouponValidation::rejected(CouponError::CouponNotFound);
    };

    if let Some(restricted) = coupon.restricted_to_product_id.as_ref()
        && !product_ids.contains(restricted)
    {
        return CouponValidation::rejected(CouponError::CouponNotValidForProduct);
    }

    let is_used_up = coupon.max_uses > 0 && coupon.used_count >= coupon.max_uses;
    let is_expired = coupon.expires.is_some_and(|e| e < now);
    let is_valid = !is_used_up && !is_expired;
    let is_redeemable =
        is_valid && coupon.percentage_discount >= MIN_REDEEMABLE_PERCENTAGE && !coupon.default;

    CouponValidation {
        is_valid,
        is_redeemable,
        is_expired,
        is_used_up,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn products(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_used_up_coupon() {
        let mut coupon = percent_coupon("c1", Some("SAVE"), "0.2");
        coupon.max_uses = 5;
        coupon.used_count = 5;
        let v = validate_coupon(Some(&coupon), &[], at(2024, 6, 1));
        assert!(v.is_used_up);
        assert!(!v.is_valid);
        assert!(!v.is_redeemable);
        assert_eq!(v.error, None);
    }

    #[test]
    fn test_expired_coupon() {
        let mut coupon = percent_coupon("c1", Some("SAVE"), "0.2");
        coupon.expires = Some(at(2023, 1, 1));
        let v = validate_coupon(Some(&coupon), &[], at(2024, 1, 1));
        assert!(v.is_expired);
        assert!(!v.is_valid);
        assert!(!v.is_redeemable);
    }

    #[test]
    fn test_default_coupon_is_valid_but_not_redeemable() {
        let mut coupon = percent_coupon("c1", None, "1.0");
        coupon.default = true;
        let v = validate_coupon(Some(&coupon), &[], at(2024, 1, 1));
        assert!(v.is_valid);
        assert!(!v.is_redeemable);
    }

    #[test]
    fn test_restricted_coupon_wrong_product() {
        let mut coupon = percent_coupon("c1", Some("SAVE"), "0.2");
        coupon.restricted_to_product_id = Some("p1".into());
        coupon.max_uses = 1;
        coupon.used_count = 1;

        let v = validate_coupon(Some(&coupon), &products(&["p2"]), at(2024, 1, 1));
        assert_eq!(v.error, Some(CouponError::CouponNotValidForProduct));
        assert!(!v.is_valid);
        assert!(!v.is_redeemable);

        coupon.used_count = 0;
        let ok = validate_coupon(Some(&coupon), &products(&["p2", "p1"]), at(2024, 1, 1));
        assert!(ok.is_redeemable);
    }

    #[test]
    fn test_missing_coupon() {
        let v = validate_coupon(None, &[], at(2024, 1, 1));
        assert_eq!(v.error, Some(CouponError::CouponNotFound));
        assert!(!v.is_valid);
    }

    #[test]
    fn test_percentage_threshold_and_fixed_type() {
        let tiny = percent_coupon("c1", Some("TINY"), "0.005");
        let v = validate_coupon(Some(&tiny), &[], at(2024, 1, 1));
        assert!(v.is_valid);
        assert!(!v.is_redeemable);

        let threshold = percent_coupon("c3", Some("ONE"), "0.01");
        assert!(validate_coupon(Some(&threshold), &[], at(2024, 1, 1)).is_redeemable);

        // 固定金额券的百分比为 0, 不算可兑换
        let fixed = fixed_coupon("c2", "TENOFF", "10");
        let v = validate_coupon(Some(&fixed), &[], at(2024, 1, 1));
        assert!(v.is_valid);
        assert!(!v.is_redeemable);
    }

    #[test]
    fn test_unlimited_uses_never_used_up() {
        let mut coupon = percent_coupon("c1", Some("SAVE"), "0.2");
        coupon.max_uses = 0;
        coupon.used_count = 1000;
        assert!(!validate_coupon(Some(&coupon), &[], at(2024, 1, 1)).is_used_up);
    }
}
