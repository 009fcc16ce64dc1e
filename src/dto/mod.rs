pub mod auth;
pub mod categories;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod users;

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

/// Rejects strings that are empty once surrounding whitespace is removed.
pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

pub(crate) fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        Err(ValidationError::new("must_not_be_negative"))
    } else {
        Ok(())
    }
}
