//! Order money math. Amounts are `Decimal` rounded half-up to cents.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    entity::coupons::{CouponType, Model as CouponModel},
    error::{AppError, AppResult},
};

const DECIMAL_PLACES: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    round_money(price * Decimal::from(quantity))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    pub final_amount: Decimal,
}

impl OrderTotals {
    /// The discount is capped at `total_amount`, so
    /// `final_amount = total_amount - discount_amount + shipping_amount` holds and is never negative.
    pub fn compute(total_amount: Decimal, discount: Decimal, shipping_amount: Decimal) -> Self {
        let total_amount = round_money(total_amount);
        let shipping_amount = round_money(shipping_amount.max(Decimal::ZERO));
        let discount_amount = round_money(discount.max(Decimal::ZERO)).min(total_amount);
        let final_amount = (total_amount - discount_amount + shipping_amount).max(Decimal::ZERO);

        Self {
            total_amount,
            discount_amount,
            shipping_amount,
            final_amount,
        }
    }
}

/// Reject coupons that are inactive, outside their validity window, used up,
/// or not reachable with this order total.
pub fn ensure_coupon_applicable(
    coupon: &CouponModel,
    total_amount: Decimal,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !coupon.is_active || coupon.deleted_at.is_some() {
        return Err(AppError::validation("Coupon is not active"));
    }
    if now < coupon.start_date.with_timezone(&Utc) {
        return Err(AppError::validation("Coupon is not yet valid"));
    }
    if now > coupon.end_date.with_timezone(&Utc) {
        return Err(AppError::validation("Coupon has expired"));
    }
    if coupon.usage_limit > 0 && coupon.used_count >= coupon.usage_limit {
        return Err(AppError::validation("Coupon usage limit reached"));
    }
    if total_amount < coupon.min_order_amount {
        return Err(AppError::validation(format!(
            "Order total must be at least {} to use this coupon",
            coupon.min_order_amount
        )));
    }
    Ok(())
}

/// Discount granted by `coupon` on `total_amount`, before capping at the total.
pub fn coupon_discount(coupon: &CouponModel, total_amount: Decimal) -> Decimal {
    match coupon.coupon_type {
        CouponType::Percentage => {
            let raw = round_money(total_amount * coupon.value / Decimal::ONE_HUNDRED);
            match coupon.max_discount_value {
                Some(cap) if cap > Decimal::ZERO => raw.min(cap),
                _ => raw,
            }
        }
        CouponType::Fixed => coupon.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::dec;

    fn coupon(coupon_type: CouponType, value: Decimal, cap: Option<Decimal>) -> CouponModel {
        let now = Utc::now();
        CouponModel {
            id: 1,
            code: "SAVE".into(),
            name: "Save".into(),
            description: None,
            coupon_type,
            value,
            min_order_amount: Decimal::ZERO,
            max_discount_value: cap,
            usage_limit: 0,
            used_count: 0,
            is_active: true,
            start_date: (now - Duration::days(1)).into(),
            end_date: (now + Duration::days(1)).into(),
            created_at: now.into(),
            updated_at: now.into(),
            deleted_at: None,
        }
    }

    #[test]
    fn line_total_multiplies_snapshot_price() {
        assert_eq!(line_total(dec!(9.99), 2), dec!(19.98));
        assert_eq!(line_total(dec!(0.335), 1), dec!(0.34));
    }

    #[test]
    fn percentage_discount_is_capped() {
        let c = coupon(CouponType::Percentage, dec!(10), Some(dec!(5)));
        assert_eq!(coupon_discount(&c, dec!(100)), dec!(5));

        let uncapped = coupon(CouponType::Percentage, dec!(10), None);
        assert_eq!(coupon_discount(&uncapped, dec!(100)), dec!(10));
    }

    #[test]
    fn fixed_discount_never_makes_final_negative() {
        let c = coupon(CouponType::Fixed, dec!(50), None);
        let totals = OrderTotals::compute(dec!(30), coupon_discount(&c, dec!(30)), Decimal::ZERO);
        assert_eq!(totals.discount_amount, dec!(30));
        assert_eq!(totals.final_amount, Decimal::ZERO);
    }

    #[test]
    fn final_amount_identity_holds() {
        let totals = OrderTotals::compute(dec!(19.98), dec!(2), dec!(3.50));
        assert_eq!(
            totals.final_amount,
            totals.total_amount - totals.discount_amount + totals.shipping_amount
        );
        assert_eq!(totals.final_amount, dec!(21.48));
    }

    #[test]
    fn expired_or_exhausted_coupons_are_rejected() {
        let now = Utc::now();
        let mut c = coupon(CouponType::Fixed, dec!(5), None);
        assert!(ensure_coupon_applicable(&c, dec!(10), now).is_ok());

        c.end_date = (now - Duration::hours(1)).into();
        assert!(ensure_coupon_applicable(&c, dec!(10), now).is_err());

        let mut c = coupon(CouponType::Fixed, dec!(5), None);
        c.usage_limit = 3;
        c.used_count = 3;
        assert!(ensure_coupon_applicable(&c, dec!(10), now).is_err());

        let mut c = coupon(CouponType::Fixed, dec!(5), None);
        c.min_order_amount = dec!(50);
        assert!(ensure_coupon_applicable(&c, dec!(10), now).is_err());

        let mut c = coupon(CouponType::Fixed, dec!(5), None);
        c.is_active = false;
        assert!(ensure_coupon_applicable(&c, dec!(10), now).is_err());
    }
}
