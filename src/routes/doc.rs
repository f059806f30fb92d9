use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{OrderStatus, PaymentStatus, Role, SessionMode, snapshot::RequestedItem},
    dto::{
        admin, announcements, auth as auth_dto, checkout as checkout_dto, orders as order_dto,
        products, wishlist as wishlist_dto,
    },
    models::{
        Announcement, AuditEntry, Employee, Order, OrderItem, Product, PublicOrder, TrackingEvent,
        User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin as admin_routes, announcements as store, auth, checkout, health, orders, params,
        products as product_routes, wishlist,
    },
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
        health::readiness,
        auth::register,
        auth::login,
        auth::verify_email,
        auth::resend_verification,
        auth::forgot_password,
        auth::reset_password,
        auth::me,
        product_routes::list_products,
        product_routes::get_product,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        checkout::create_session,
        checkout::payment_confirmed,
        orders::list_my_orders,
        orders::get_my_order,
        orders::track_order,
        store::list_announcements,
        store::list_employees,
        admin_routes::dashboard,
        admin_routes::list_products,
        admin_routes::create_product,
        admin_routes::update_product,
        admin_routes::delete_product,
        admin_routes::list_all_orders,
        admin_routes::get_order_admin,
        admin_routes::update_order_status,
        admin_routes::append_tracking_event,
        admin_routes::list_customers,
        admin_routes::list_users,
        admin_routes::change_role,
        admin_routes::delete_user,
        admin_routes::list_announcements,
        admin_routes::create_announcement,
        admin_routes::update_announcement,
        admin_routes::delete_announcement,
        admin_routes::list_audit_logs
    ),
    components(
        schemas(
            OrderStatus,
            PaymentStatus,
            Role,
            SessionMode,
            RequestedItem,
            User,
            Product,
            Order,
            OrderItem,
            PublicOrder,
            TrackingEvent,
            Announcement,
            Employee,
            AuditEntry,
            auth_dto::RegisterRequest,
            auth_dto::RegisterResponse,
            auth_dto::LoginRequest,
            auth_dto::LoginResponse,
            auth_dto::TokenRequest,
            auth_dto::EmailRequest,
            auth_dto::ResetPasswordRequest,
            auth_dto::MeResponse,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ProductList,
            wishlist_dto::WishlistProducts,
            checkout_dto::CreateCheckoutSessionRequest,
            checkout_dto::CheckoutSessionResponse,
            checkout_dto::WebhookAck,
            order_dto::OrderList,
            order_dto::OrderDetail,
            order_dto::TrackingView,
            order_dto::UpdateOrderStatusRequest,
            order_dto::AppendTrackingEventRequest,
            admin::DashboardCounts,
            admin::UserList,
            admin::EmployeeList,
            admin::AuditList,
            admin::ChangeRoleRequest,
            announcements::CreateAnnouncementRequest,
            announcements::UpdateAnnouncementRequest,
            announcements::AnnouncementList,
            params::Pagination,
            params::ProductQuery,
            params::ProductSort,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<order_dto::OrderDetail>,
            ApiResponse<order_dto::TrackingView>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Accounts, sessions and one-time links"),
        (name = "Products", description = "Catalog browsing"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Checkout", description = "Hosted payment and payment notifications"),
        (name = "Orders", description = "A customer's own orders"),
        (name = "Tracking", description = "Public order tracking"),
        (name = "Store", description = "Announcements and staff directory"),
        (name = "Admin", description = "Staff endpoints; admin-mode session required"),
        (name = "Owner", description = "Owner-only endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
