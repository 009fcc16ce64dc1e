use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::non_blank;
use crate::models::Category;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100), custom(function = "non_blank"))]
    pub name: String,
    pub description: Option<String>,
    /// Derived from `name` when omitted.
    #[validate(length(max = 100))]
    pub slug: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}
