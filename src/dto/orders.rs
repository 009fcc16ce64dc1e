use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::non_blank;
use crate::{
    entity::orders::{OrderStatus, PaymentMethod, PaymentStatus},
    models::{Order, OrderItem},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct OrderItemInput {
    pub product_id: i64,
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct PlaceOrderRequest {
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, max = 500), custom(function = "non_blank"))]
    pub shipping_address: String,
    /// Falls back to the shipping address.
    #[validate(length(max = 500))]
    pub billing_address: Option<String>,
    #[validate(length(min = 1, max = 100), custom(function = "non_blank"))]
    pub customer_name: String,
    #[validate(length(min = 6, max = 20), custom(function = "non_blank"))]
    pub customer_phone: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<OrderItemInput>,
}

impl PlaceOrderRequest {
    /// Quantities of repeated product ids summed, ordered by product id.
    pub fn merged_items(&self) -> Vec<(i64, i32)> {
        let mut merged: BTreeMap<i64, i32> = BTreeMap::new();
        for item in &self.items {
            let qty = merged.entry(item.product_id).or_insert(0);
            *qty = qty.saturating_add(item.quantity);
        }
        merged.into_iter().collect()
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuestLookupRequest {
    #[validate(length(min = 3, max = 255))]
    pub email_or_phone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentStatusCount {
    pub payment_status: PaymentStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStats {
    pub total_orders: i64,
    pub guest_orders: i64,
    pub registered_orders: i64,
    pub by_status: Vec<StatusCount>,
    pub by_payment_status: Vec<PaymentStatusCount>,
    /// Sum of `final_amount` over paid orders.
    pub paid_revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GuestOrderStats {
    pub total_guest_orders: i64,
    pub by_status: Vec<StatusCount>,
    pub paid_revenue: Decimal,
}
