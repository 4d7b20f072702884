use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{AppError, AppResult};
use crate::models::{AppliedDiscount, DiscountKind, PriceCalculation, PriceInput};

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Applies at most one rate discount, then a fixed amount, then upgrade credit,
/// clamping the unit price at zero after each step.
pub fn calculate_price(input: &PriceInput) -> AppResult<PriceCalculation> {
    if input.quantity == 0 {
        return Err(AppError::ValidationError(
            "quantity must be at least 1".to_string(),
        ));
    }
    if input.base_price < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "price cannot be negative".to_string(),
        ));
    }
    if let Some(rd) = input.rate_discount
        && (rd.rate < Decimal::ZERO || rd.rate > Decimal::ONE)
    {
        return Err(AppError::ValidationError(format!(
            "discount rate {} is outside 0..=1",
            rd.rate
        )));
    }
    if input.fixed_discount.is_some_and(|f| f < Decimal::ZERO) {
        return Err(AppError::ValidationError(
            "fixed discount cannot be negative".to_string(),
        ));
    }
    if input.upgrade_credit.is_some_and(|c| c < Decimal::ZERO) {
        return Err(AppError::ValidationError(
            "upgrade credit cannot be negative".to_string(),
        ));
    }

    let mut applied = Vec::new();
    let mut unit = input.base_price;

    if let Some(rd) = input.rate_discount {
        let after = unit * (Decimal::ONE - rd.rate);
        applied.push(AppliedDiscount {
            kind: rd.source.into(),
            rate: Some(rd.rate),
            amount: round_money(unit - after),
        });
        unit = after;
    }

    if let Some(fixed) = input.fixed_discount {
        let after = (unit - fixed).max(Decimal::ZERO);
        applied.push(AppliedDiscount {
            kind: DiscountKind::FixedAmount,
            rate: None,
            amount: round_money(unit - after),
        });
        unit = after;
    }

    if let Some(credit) = input.upgrade_credit {
        let after = (unit - credit).max(Decimal::ZERO);
        applied.push(AppliedDiscount {
            kind: DiscountKind::UpgradeCredit,
            rate: None,
            amount: round_money(unit - after),
        });
        unit = after;
    }

    let final_unit_price = round_money(unit);
    Ok(PriceCalculation {
        unit_price: round_money(input.base_price),
        final_unit_price,
        quantity: input.quantity,
        total_price: round_money(final_unit_price * Decimal::from(input.quantity)),
        applied_discounts: applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RateDiscount, RateSource};
    use rust_decimal_macros::dec;

    fn input(base: Decimal) -> PriceInput {
        PriceInput {
            base_price: base,
            rate_discount: None,
            fixed_discount: None,
            upgrade_credit: None,
            quantity: 1,
        }
    }

    fn rate(source: RateSource, rate: Decimal) -> Option<RateDiscount> {
        Some(RateDiscount { source, rate })
    }

    #[test]
    fn test_percentage_coupon() {
        let calc = calculate_price(&PriceInput {
            rate_discount: rate(RateSource::Coupon, dec!(0.20)),
            ..input(dec!(100))
        })
        .unwrap();
        assert_eq!(calc.final_unit_price, dec!(80.00));
        assert_eq!(calc.total_price, dec!(80.00));
        assert!(calc.has_discount(DiscountKind::PercentageCoupon));
        assert_eq!(calc.applied_discounts[0].amount, dec!(20.00));
    }

    #[test]
    fn test_fixed_amount() {
        let calc = calculate_price(&PriceInput {
            fixed_discount: Some(dec!(15)),
            ..input(dec!(100))
        })
        .unwrap();
        assert_eq!(calc.final_unit_price, dec!(85.00));
        assert!(calc.has_discount(DiscountKind::FixedAmount));
    }

    #[test]
    fn test_upgrade_credit() {
        let calc = calculate_price(&PriceInput {
            upgrade_credit: Some(dec!(30)),
            ..input(dec!(100))
        })
        .unwrap();
        assert_eq!(calc.final_unit_price, dec!(70.00));
        assert!(calc.has_discount(DiscountKind::UpgradeCredit));
    }

    #[test]
    fn test_clamped_at_zero() {
        let calc = calculate_price(&PriceInput {
            fixed_discount: Some(dec!(150)),
            upgrade_credit: Some(dec!(10)),
            quantity: 3,
            ..input(dec!(100))
        })
        .unwrap();
        assert_eq!(calc.final_unit_price, Decimal::ZERO);
        assert_eq!(calc.total_price, Decimal::ZERO);
        assert_eq!(calc.applied_discounts[0].amount, dec!(100.00));
        assert_eq!(calc.applied_discounts[1].amount, Decimal::ZERO);
    }

    #[test]
    fn test_stacking_order_and_quantity() {
        // 100 * 0.9 = 90, -10 = 80, -5 = 75, x4 = 300
        let calc = calculate_price(&PriceInput {
            rate_discount: rate(RateSource::Bulk, dec!(0.10)),
            fixed_discount: Some(dec!(10)),
            upgrade_credit: Some(dec!(5)),
            quantity: 4,
            ..input(dec!(100))
        })
        .unwrap();
        assert_eq!(calc.final_unit_price, dec!(75.00));
        assert_eq!(calc.total_price, dec!(300.00));
        let kinds: Vec<DiscountKind> = calc.applied_discounts.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiscountKind::Bulk,
                DiscountKind::FixedAmount,
                DiscountKind::UpgradeCredit
            ]
        );
    }

    #[test]
    fn test_rounding_midpoint_away_from_zero() {
        // 0.25 * (1 - 0.5) = 0.125 -> 0.13
        let calc = calculate_price(&PriceInput {
            rate_discount: rate(RateSource::Ppp, dec!(0.5)),
            ..input(dec!(0.25))
        })
        .unwrap();
        assert_eq!(calc.final_unit_price, dec!(0.13));
    }

    #[test]
    fn test_monotonic_in_discounts() {
        let base = dec!(199.99);
        let mut previous = calculate_price(&input(base)).unwrap().final_unit_price;
        for r in [dec!(0.05), dec!(0.10), dec!(0.15), dec!(0.5), dec!(1)] {
            let price = calculate_price(&PriceInput {
                rate_discount: rate(RateSource::Coupon, r),
                ..input(base)
            })
            .unwrap()
            .final_unit_price;
            assert!(price <= previous);
            assert!(price >= Decimal::ZERO);
            previous = price;
        }
        for f in [dec!(1), dec!(50), dec!(500)] {
            let price = calculate_price(&PriceInput {
                fixed_discount: Some(f),
                ..input(base)
            })
            .unwrap()
            .final_unit_price;
            assert!(price <= base);
            assert!(price >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(calculate_price(&PriceInput {
            quantity: 0,
            ..input(dec!(10))
        })
        .is_err());
        assert!(calculate_price(&input(dec!(-1))).is_err());
        assert!(calculate_price(&PriceInput {
            rate_discount: rate(RateSource::Coupon, dec!(1.5)),
            ..input(dec!(10))
        })
        .is_err());
        assert!(calculate_price(&PriceInput {
            fixed_discount: Some(dec!(-1)),
            ..input(dec!(10))
        })
        .is_err());
        assert!(calculate_price(&PriceInput {
            upgrade_credit: Some(dec!(-1)),
            ..input(dec!(10))
        })
        .is_err());
    }
}
