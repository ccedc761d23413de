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
    dto::{
        analytics::{AnalyticsQuery, DailyRevenue, Dashboard, ItemSales, SalesSummary},
        auth::{CreateUserRequest, LoginRequest, LoginResponse},
        cart::{AddToCartRequest, CartView, StartSessionRequest},
        menu::{
            CreateMenuItemRequest, InventoryAdjustRequest, MenuBySection, MenuItemList,
            UpdateMenuItemRequest,
        },
        orders::{
            CheckoutRequest, EmailBillRequest, EmailBillResult, OrderList, OrderWithItems,
            PlacedOrder, StaffCheckoutRequest, UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
        },
        settings::UpdateSettingsRequest,
        tables::{CreateTableRequest, MenuQrRequest, TableList, UpdateTableStatusRequest},
    },
    models::{
        CartLine, MenuItem, MenuSection, Order, OrderItem, OrderSession, OrderStatus,
        PaymentStatus, Settings, Table, TableStatus, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, dashboard, health, menu, orders, params, tables},
    services::billing::Totals,
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
        auth::login,
        menu::list_menu,
        menu::get_menu_item,
        cart::start_session,
        cart::view_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::checkout,
        orders::staff_checkout,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::update_payment_status,
        orders::download_bill,
        orders::email_bill,
        tables::list_tables,
        tables::create_table,
        tables::update_table_status,
        tables::table_qr,
        tables::menu_qr,
        tables::update_menu_qr,
        dashboard::dashboard,
        dashboard::get_settings,
        admin::update_settings,
        admin::create_menu_item,
        admin::update_menu_item,
        admin::delete_menu_item,
        admin::adjust_inventory,
        admin::list_low_stock,
        admin::sales_summary,
        admin::create_user,
        admin::export_menu,
        admin::export_orders
    ),
    components(
        schemas(
            User,
            MenuItem,
            MenuSection,
            OrderSession,
            CartLine,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            Table,
            TableStatus,
            Settings,
            Totals,
            LoginRequest,
            LoginResponse,
            CreateUserRequest,
            StartSessionRequest,
            AddToCartRequest,
            CartView,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            InventoryAdjustRequest,
            MenuBySection,
            MenuItemList,
            CheckoutRequest,
            StaffCheckoutRequest,
            UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
            EmailBillRequest,
            EmailBillResult,
            OrderList,
            OrderWithItems,
            PlacedOrder,
            CreateTableRequest,
            UpdateTableStatusRequest,
            MenuQrRequest,
            TableList,
            UpdateSettingsRequest,
            AnalyticsQuery,
            DailyRevenue,
            ItemSales,
            SalesSummary,
            Dashboard,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<MenuItem>,
            ApiResponse<MenuBySection>,
            ApiResponse<CartView>,
            ApiResponse<PlacedOrder>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<SalesSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Staff login"),
        (name = "Menu", description = "Public menu"),
        (name = "Cart", description = "Order sessions and carts"),
        (name = "Orders", description = "Checkout, order management and bills"),
        (name = "Tables", description = "Tables and QR codes"),
        (name = "Dashboard", description = "Staff dashboard and settings"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
