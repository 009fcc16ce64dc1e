use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
        categories::{CategoryList, CategoryRequest},
        coupons::{CouponList, CouponRequest},
        orders::{
            GuestLookupRequest, GuestOrderStats, OrderItemInput, OrderList, OrderStats,
            OrderWithItems, PaymentStatusCount, PlaceOrderRequest, StatusCount,
            UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
        },
        products::{
            CreateProductRequest, ProductList, SetStockRequest, StockUpdate, UpdateProductRequest,
        },
        users::{UpdateRoleRequest, UserList},
    },
    entity::{
        coupons::CouponType,
        orders::{OrderStatus, PaymentMethod, PaymentStatus},
        users::Role,
    },
    models::{Category, Coupon, Order, OrderItem, Product, User},
    response::{ApiResponse, Meta},
    routes::{auth, categories, coupons, health, orders, params, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::get_profile,
        auth::update_profile,
        categories::list_categories,
        categories::get_category,
        categories::get_category_by_slug,
        categories::admin_list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::get_product_by_sku,
        products::admin_list_products,
        products::admin_get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::set_stock,
        orders::place_order,
        orders::my_orders,
        orders::get_order,
        orders::track_order,
        orders::lookup_guest_orders,
        orders::list_all_orders,
        orders::order_stats,
        orders::guest_order_stats,
        orders::get_order_admin,
        orders::update_order_status,
        orders::update_payment_status,
        orders::delete_order,
        coupons::list_coupons,
        coupons::get_coupon,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        users::list_users,
        users::get_user,
        users::update_role,
        users::toggle_status,
        users::delete_user
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Order,
            OrderItem,
            Coupon,
            Role,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            CouponType,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            SetStockRequest,
            StockUpdate,
            ProductList,
            PlaceOrderRequest,
            OrderItemInput,
            GuestLookupRequest,
            UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
            OrderWithItems,
            OrderList,
            OrderStats,
            GuestOrderStats,
            StatusCount,
            PaymentStatusCount,
            CouponRequest,
            CouponList,
            UpdateRoleRequest,
            UserList,
            params::SortOrder,
            params::ProductSortBy,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Categories", description = "Public category endpoints"),
        (name = "Products", description = "Public product endpoints"),
        (name = "Orders", description = "Order placement, tracking and history"),
        (name = "Admin", description = "Back office endpoints (admin or owner)"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_order_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/orders"));
        assert!(doc.paths.paths.contains_key("/api/public/orders/track/{order_number}"));
        assert!(doc.paths.paths.contains_key("/api/admin/products/{id}/stock"));
    }
}
