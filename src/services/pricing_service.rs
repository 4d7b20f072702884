use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Coupon, CouponError, CouponValidation, PriceBreakdown, PriceInput, PriceRequest,
    PurchaseStatus, RateDiscount, RateSource,
};
use crate::repositories::{CatalogStore, PurchaseStore};
use crate::services::{calculate_price, validate_coupon};
use crate::utils::normalize_optional_country;

#[derive(Clone)]
pub struct PricingService {
    catalog: Arc<dyn CatalogStore>,
    purchases: Arc<dyn PurchaseStore>,
    pricing: PricingConfig,
}

impl PricingService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        purchases: Arc<dyn PurchaseStore>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            catalog,
            purchases,
            pricing,
        }
    }

    /// 校验优惠码是否可用于指定商品
    pub async fn validate_coupon_code(
        &self,
        code: &str,
        product_ids: &[String],
    ) -> AppResult<CouponValidation> {
        let coupon = self.catalog.get_coupon(code.trim()).await?;
        Ok(validate_coupon(coupon.as_ref(), product_ids, Utc::now()))
    }

    /// Price of a product for one request. `Ok(None)` when the product does not exist.
    pub async fn compute_price(&self, req: &PriceRequest) -> AppResult<Option<PriceBreakdown>> {
        self.compute_price_at(req, Utc::now()).await
    }

    pub async fn compute_price_at(
        &self,
        req: &PriceRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PriceBreakdown>> {
        let Some(product) = self.catalog.get_product(&req.product_id).await? else {
            return Ok(None);
        };

        let quantity = req.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(AppError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        if !product.has_unlimited_quantity() && i64::from(quantity) > i64::from(product.quantity_available)
        {
            return Err(AppError::ValidationError(format!(
                "only {} left for product {}",
                product.quantity_available, product.id
            )));
        }
        let country = normalize_optional_country(req.country_code.as_deref())?;
        let product_ids = vec![product.id.clone()];

        let (coupon, coupon_error) = self
            .resolve_coupon(req.coupon_code.as_deref(), &product_ids, now)
            .await?;
        let upgrade_credit = self.resolve_upgrade_credit(req).await?;

        let coupon_rate = coupon
            .as_ref()
            .filter(|c| !c.is_fixed_type() && c.percentage_discount > Decimal::ZERO)
            .map(|c| RateDiscount {
                source: RateSource::Coupon,
                rate: c.percentage_discount,
            });
        let bulk_rate = (quantity > 1)
            .then(|| self.pricing.bulk_rate(quantity))
            .flatten()
            .map(|rate| RateDiscount {
                source: RateSource::Bulk,
                rate,
            });
        let ppp_rate = (quantity == 1 && upgrade_credit.is_none())
            .then(|| country.as_deref().and_then(|c| self.pricing.ppp_rate(c)))
            .flatten()
            .map(|rate| RateDiscount {
                source: RateSource::Ppp,
                rate,
            });

        // 只取一个比例折扣: 取最大值, 相同时按 coupon > bulk > ppp
        let mut rate_discount: Option<RateDiscount> = None;
        for candidate in [coupon_rate, bulk_rate, ppp_rate].into_iter().flatten() {
            if rate_discount.is_none_or(|best| candidate.rate > best.rate) {
                rate_discount = Some(candidate);
            }
        }

        let fixed_discount = coupon
            .as_ref()
            .filter(|c| c.is_fixed_type())
            .and_then(|c| c.amount_discount);

        let calculation = calculate_price(&PriceInput {
            base_price: product.price,
            rate_discount,
            fixed_discount,
            upgrade_credit,
            quantity,
        })?;

        let coupon_applied = fixed_discount.is_some()
            || rate_discount.is_some_and(|r| r.source == RateSource::Coupon);
        let applied_coupon_id = coupon.filter(|_| coupon_applied).map(|c| c.id);

        Ok(Some(PriceBreakdown {
            product_id: product.id,
            applied_coupon_id,
            coupon_error,
            country,
            calculation,
        }))
    }

    /// An entered code wins when redeemable; otherwise falls back to the product's
    /// valid default coupon. Problems with the entered code are reported, never raised.
    async fn resolve_coupon(
        &self,
        code: Option<&str>,
        product_ids: &[String],
        now: DateTime<Utc>,
    ) -> AppResult<(Option<Coupon>, Option<CouponError>)> {
        let mut coupon_error = None;

        if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
            let entered = self.catalog.get_coupon(code).await?;
            let validation = validate_coupon(entered.as_ref(), product_ids, now);
            // 固定金额券按金额计价, 不要求百分比门槛
            let accepted = |c: &Coupon| {
                !c.is_bulk()
                    && (validation.is_redeemable
                        || (validation.is_valid && !c.default && c.is_fixed_type()))
            };
            match entered {
                Some(c) if accepted(&c) => {
                    return Ok((Some(c), None));
                }
                _ => {
                    let error = validation.error.unwrap_or(if validation.is_expired {
                        CouponError::CouponExpired
                    } else if validation.is_used_up {
                        CouponError::CouponUsedUp
                    } else {
                        CouponError::CouponNotRedeemable
                    });
                    log::warn!("Coupon code {code} not applied: {error}");
                    coupon_error = Some(error);
                }
            }
        }

        let default = self.catalog.get_default_coupon(product_ids).await?;
        let default = default.filter(|c| validate_coupon(Some(c), product_ids, now).is_valid);
        Ok((default, coupon_error))
    }

    async fn resolve_upgrade_credit(&self, req: &PriceRequest) -> AppResult<Option<Decimal>> {
        let (Some(purchase_id), Some(user_id)) =
            (req.upgrade_from_purchase_id.as_deref(), req.user_id.as_deref())
        else {
            return Ok(None);
        };
        let details = self
            .purchases
            .get_purchase_details(purchase_id, user_id)
            .await?;
        match details.purchase {
            Some(p) if p.status == PurchaseStatus::Valid => Ok(Some(p.total_amount)),
            _ => {
                log::warn!("Upgrade purchase {purchase_id} not usable for user {user_id}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountKind;
    use crate::repositories::MemoryStore;
    use crate::test_support::*;
    use rust_decimal_macros::dec;

    async fn setup(config: PricingConfig) -> (Arc<MemoryStore>, PricingService) {
        let store = Arc::new(MemoryStore::new());
        store.put_product(product("p1", "100", &["w1"])).await;
        store
            .put_coupon(percent_coupon("c20", Some("SAVE20"), "0.20"))
            .await;
        store.put_coupon(fixed_coupon("c15", "FIFTEEN", "15")).await;
        let service = PricingService::new(store.clone(), store.clone(), config);
        (store, service)
    }

    fn request(product_id: &str) -> PriceRequest {
        PriceRequest {
            product_id: product_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_product_is_none() {
        let (_, service) = setup(PricingConfig::default()).await;
        assert!(service.compute_price(&request("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_percentage_coupon_applied() {
        let (_, service) = setup(PricingConfig::default()).await;
        let breakdown = service
            .compute_price(&PriceRequest {
                coupon_code: Some("SAVE20".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.calculation.final_unit_price, dec!(80));
        assert_eq!(breakdown.applied_coupon_id.as_deref(), Some("c20"));
        assert_eq!(breakdown.coupon_error, None);
    }

    #[tokio::test]
    async fn test_fixed_coupon_applied() {
        let (_, service) = setup(PricingConfig::default()).await;
        let breakdown = service
            .compute_price(&PriceRequest {
                coupon_code: Some("FIFTEEN".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.calculation.final_unit_price, dec!(85));
        assert!(breakdown.calculation.has_discount(DiscountKind::FixedAmount));
        assert_eq!(breakdown.applied_coupon_id.as_deref(), Some("c15"));

        // 校验接口只认百分比门槛, 计价仍接受固定金额券
        let v = service
            .validate_coupon_code("FIFTEEN", &["p1".to_string()])
            .await
            .unwrap();
        assert!(v.is_valid);
        assert!(!v.is_redeemable);
    }

    #[tokio::test]
    async fn test_expired_fixed_coupon_not_applied() {
        let (store, service) = setup(PricingConfig::default()).await;
        let mut old = fixed_coupon("c5", "OLDFIVE", "5");
        old.expires = Some(at(2020, 1, 1));
        store.put_coupon(old).await;

        let breakdown = service
            .compute_price(&PriceRequest {
                coupon_code: Some("OLDFIVE".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.applied_coupon_id, None);
        assert_eq!(breakdown.coupon_error, Some(CouponError::CouponExpired));
        assert_eq!(breakdown.calculation.final_unit_price, dec!(100));
    }

    #[tokio::test]
    async fn test_upgrade_credit_only_for_owner() {
        let (store, service) = setup(PricingConfig::default()).await;
        let mut old = purchase("old", "u1", "p0", PurchaseStatus::Valid);
        old.total_amount = dec!(30);
        store.put_purchase(old).await;

        let owner = service
            .compute_price(&PriceRequest {
                upgrade_from_purchase_id: Some("old".into()),
                user_id: Some("u1".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.calculation.final_unit_price, dec!(70));

        let stranger = service
            .compute_price(&PriceRequest {
                upgrade_from_purchase_id: Some("old".into()),
                user_id: Some("u2".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stranger.calculation.final_unit_price, dec!(100));
    }

    #[tokio::test]
    async fn test_largest_rate_wins() {
        let mut config = PricingConfig::default();
        config.ppp_rates.insert("IN".into(), dec!(0.40));
        let (_, service) = setup(config).await;

        let ppp = service
            .compute_price(&PriceRequest {
                coupon_code: Some("SAVE20".into()),
                country_code: Some("in".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ppp.calculation.final_unit_price, dec!(60));
        assert!(ppp.calculation.has_discount(DiscountKind::Ppp));
        assert!(!ppp.calculation.has_discount(DiscountKind::PercentageCoupon));
        assert_eq!(ppp.applied_coupon_id, None);
        assert_eq!(ppp.country.as_deref(), Some("IN"));

        // PPP never applies to multi-seat purchases
        let team = service
            .compute_price(&PriceRequest {
                quantity: Some(10),
                country_code: Some("IN".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert!(team.calculation.has_discount(DiscountKind::Bulk));
        assert_eq!(team.calculation.final_unit_price, dec!(90));
        assert_eq!(team.calculation.total_price, dec!(900));
    }

    #[tokio::test]
    async fn test_tie_prefers_coupon_over_bulk() {
        let (store, service) = setup(PricingConfig::default()).await;
        store
            .put_coupon(percent_coupon("c10", Some("TEN"), "0.10"))
            .await;
        let breakdown = service
            .compute_price(&PriceRequest {
                coupon_code: Some("TEN".into()),
                quantity: Some(10),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert!(breakdown.calculation.has_discount(DiscountKind::PercentageCoupon));
        assert!(!breakdown.calculation.has_discount(DiscountKind::Bulk));
    }

    #[tokio::test]
    async fn test_bad_code_reported_and_default_used() {
        let (store, service) = setup(PricingConfig::default()).await;
        let mut expired = percent_coupon("old", Some("OLD"), "0.5");
        expired.expires = Some(at(2020, 1, 1));
        store.put_coupon(expired).await;
        let mut default = percent_coupon("sale", None, "0.25");
        default.default = true;
        store.put_coupon(default).await;

        let breakdown = service
            .compute_price(&PriceRequest {
                coupon_code: Some("OLD".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.coupon_error, Some(CouponError::CouponExpired));
        assert_eq!(breakdown.applied_coupon_id.as_deref(), Some("sale"));
        assert_eq!(breakdown.calculation.final_unit_price, dec!(75));

        let missing = service
            .compute_price(&PriceRequest {
                coupon_code: Some("NOPE".into()),
                ..request("p1")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(missing.coupon_error, Some(CouponError::CouponNotFound));
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected() {
        let (store, service) = setup(PricingConfig::default()).await;
        let mut limited = product("limited", "50", &[]);
        limited.quantity_available = 3;
        store.put_product(limited).await;

        let too_many = service
            .compute_price(&PriceRequest {
                quantity: Some(4),
                ..request("limited")
            })
            .await;
        assert!(matches!(too_many, Err(AppError::ValidationError(_))));

        let zero = service
            .compute_price(&PriceRequest {
                quantity: Some(0),
                ..request("p1")
            })
            .await;
        assert!(zero.is_err());

        let bad_country = service
            .compute_price(&PriceRequest {
                country_code: Some("India".into()),
                ..request("p1")
            })
            .await;
        assert!(matches!(bad_country, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_validate_coupon_code() {
        let (_, service) = setup(PricingConfig::default()).await;
        let v = service
            .validate_coupon_code("SAVE20", &["p1".to_string()])
            .await
            .unwrap();
        assert!(v.is_redeemable);
        let missing = service.validate_coupon_code("NOPE", &[]).await.unwrap();
        assert_eq!(missing.error, Some(CouponError::CouponNotFound));
    }
}
