use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{
    categories, coupons,
    coupons::CouponType,
    order_items, orders,
    orders::{OrderStatus, PaymentMethod, PaymentStatus},
    products, users,
    users::Role,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            address: model.address,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            slug: model.slug,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sku: String,
    pub stock: i32,
    pub category_id: Option<i64>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            sku: model.sku,
            stock: model.stock,
            category_id: model.category_id,
            material: model.material,
            color: model.color,
            size: model.size,
            is_active: model.is_active,
            is_featured: model.is_featured,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    pub final_amount: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_address: String,
    pub billing_address: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub notes: Option<String>,
    pub is_guest_order: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            order_number: model.order_number,
            status: model.status,
            payment_status: model.payment_status,
            payment_method: model.payment_method,
            total_amount: model.total_amount,
            discount_amount: model.discount_amount,
            shipping_amount: model.shipping_amount,
            final_amount: model.final_amount,
            coupon_code: model.coupon_code,
            shipping_address: model.shipping_address,
            billing_address: model.billing_address,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            customer_email: model.customer_email,
            notes: model.notes,
            is_guest_order: model.is_guest_order,
            shipped_at: model.shipped_at.map(|dt| dt.with_timezone(&Utc)),
            delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            quantity: model.quantity,
            price: model.price,
            total: model.total,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    pub value: Decimal,
    pub min_order_amount: Decimal,
    pub max_discount_value: Option<Decimal>,
    pub usage_limit: i32,
    pub used_count: i32,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<coupons::Model> for Coupon {
    fn from(model: coupons::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            description: model.description,
            coupon_type: model.coupon_type,
            value: model.value,
            min_order_amount: model.min_order_amount,
            max_discount_value: model.max_discount_value,
            usage_limit: model.usage_limit,
            used_count: model.used_count,
            is_active: model.is_active,
            start_date: model.start_date.with_timezone(&Utc),
            end_date: model.end_date.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
