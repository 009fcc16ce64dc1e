use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{non_blank, non_negative_amount, positive_amount};
use crate::{entity::coupons::CouponType, models::Coupon};

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct CouponRequest {
    #[validate(length(min = 3, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 200), custom(function = "non_blank"))]
    pub name: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    #[validate(custom(function = "positive_amount"))]
    pub value: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub min_order_amount: Decimal,
    #[validate(custom(function = "positive_amount"))]
    pub max_discount_value: Option<Decimal>,
    /// Zero means unlimited.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub usage_limit: i32,
    pub is_active: Option<bool>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

fn validate_window(req: &CouponRequest) -> Result<(), ValidationError> {
    if req.end_date <= req.start_date {
        return Err(ValidationError::new("end_date_before_start_date"));
    }
    if req.coupon_type == CouponType::Percentage && req.value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_above_100"));
    }
    Ok(())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponList {
    pub items: Vec<Coupon>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::dec;

    fn request(coupon_type: CouponType, value: Decimal) -> CouponRequest {
        let start_date = Utc::now();
        CouponRequest {
            code: "SUMMER10".into(),
            name: "Summer".into(),
            description: None,
            coupon_type,
            value,
            min_order_amount: Decimal::ZERO,
            max_discount_value: Some(dec!(5)),
            usage_limit: 0,
            is_active: None,
            start_date,
            end_date: start_date + Duration::days(7),
        }
    }

    #[test]
    fn accepts_a_well_formed_coupon() {
        assert!(request(CouponType::Percentage, dec!(10)).validate().is_ok());
        assert!(request(CouponType::Fixed, dec!(250)).validate().is_ok());
    }

    #[test]
    fn rejects_percentages_above_one_hundred() {
        assert!(request(CouponType::Percentage, dec!(101)).validate().is_err());
    }

    #[test]
    fn rejects_inverted_window_and_non_positive_values() {
        let mut req = request(CouponType::Fixed, dec!(10));
        req.end_date = req.start_date;
        assert!(req.validate().is_err());

        assert!(request(CouponType::Fixed, Decimal::ZERO).validate().is_err());

        let mut req = request(CouponType::Fixed, dec!(10));
        req.name = "  ".into();
        assert!(req.validate().is_err());

        let mut req = request(CouponType::Fixed, dec!(10));
        req.max_discount_value = Some(dec!(-1));
        assert!(req.validate().is_err());
    }
}
