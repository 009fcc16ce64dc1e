//! Legal moves for an order's shipment and payment status.

use crate::{
    entity::orders::{OrderStatus, PaymentStatus},
    error::{AppError, AppResult},
};

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

pub fn ensure_status_transition(from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(AppError::conflict(format!(
        "Cannot change order status from {} to {}",
        from.as_str(),
        to.as_str()
    )))
}

pub fn ensure_payment_transition(from: PaymentStatus, to: PaymentStatus) -> AppResult<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(AppError::conflict(format!(
        "Cannot change payment status from {} to {}",
        from.as_str(),
        to.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn shipment_moves_forward_only() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Shipped));
    }

    #[test]
    fn cancel_only_before_shipping() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in OrderStatus::iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::iter() {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn payment_settles_once() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Paid));
        assert!(matches!(
            ensure_payment_transition(PaymentStatus::Paid, PaymentStatus::Pending),
            Err(AppError::Conflict(_))
        ));
    }
}
