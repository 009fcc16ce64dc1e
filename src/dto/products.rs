use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{non_blank, positive_amount};
use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200), custom(function = "non_blank"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "positive_amount"))]
    pub price: Decimal,
    #[validate(length(min = 1, max = 50), custom(function = "non_blank"))]
    pub sku: String,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub category_id: Option<i64>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Full overwrite of the descriptive fields. Stock is changed through the stock endpoint.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200), custom(function = "non_blank"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "positive_amount"))]
    pub price: Decimal,
    #[validate(length(min = 1, max = 50), custom(function = "non_blank"))]
    pub sku: String,
    pub category_id: Option<i64>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetStockRequest {
    #[validate(range(min = 0))]
    pub stock: i32,
    /// The stock value the caller last saw; the write is refused if it changed since.
    #[validate(range(min = 0))]
    pub expected_stock: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockUpdate {
    pub product_id: i64,
    pub old_stock: i32,
    pub new_stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
