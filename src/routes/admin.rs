use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};

use crate::{
    dto::{
        analytics::{AnalyticsQuery, SalesSummary},
        auth::CreateUserRequest,
        menu::{
            CreateMenuItemRequest, InventoryAdjustRequest, MenuBySection, MenuItemList,
            UpdateMenuItemRequest,
        },
        orders::OrderWithItems,
        settings::UpdateSettingsRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{MenuItem, Settings, User},
    response::ApiResponse,
    routes::params::LowStockQuery,
    services::{
        analytics_service, auth_service, export_service, menu_service, settings_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", put(update_settings))
        .route("/menu", post(create_menu_item))
        .route("/menu/{id}", put(update_menu_item).delete(delete_menu_item))
        .route("/menu/{id}/inventory", patch(adjust_inventory))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/analytics", get(sales_summary))
        .route("/users", post(create_user))
        .route("/export/menu", get(export_menu))
        .route("/export/orders", get(export_orders))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = ApiResponse<Settings>),
        (status = 400, description = "Invalid settings"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> AppResult<Json<ApiResponse<Settings>>> {
    let resp = settings_service::update_settings(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/menu",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item created with the next BEV/FOOD id", body = ApiResponse<MenuItem>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::create_menu_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/menu/{id}",
    params(("id" = String, Path, description = "Menu item id")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItem>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::update_menu_item(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/menu/{id}",
    params(("id" = String, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Menu item deleted"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = menu_service::delete_menu_item(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/menu/{id}/inventory",
    params(("id" = String, Path, description = "Menu item id")),
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Inventory adjusted", body = ApiResponse<MenuItem>),
        (status = 400, description = "Zero delta or negative result"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::adjust_inventory(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Items at or below the threshold", body = ApiResponse<MenuItemList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<MenuItemList>>> {
    let resp = menu_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Sales summary for the date range", body = ApiResponse<SalesSummary>),
        (status = 400, description = "start is after end"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ApiResponse<SalesSummary>>> {
    let resp = analytics_service::sales_summary(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Staff or admin account created", body = ApiResponse<User>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::create_user(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/export/menu",
    responses(
        (status = 200, description = "Full menu, grouped by section", body = ApiResponse<MenuBySection>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn export_menu(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MenuBySection>>> {
    let resp = export_service::export_menu(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/export/orders",
    responses(
        (status = 200, description = "Every order with its items", body = ApiResponse<Vec<OrderWithItems>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn export_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<OrderWithItems>>>> {
    let resp = export_service::export_orders(&state, &user).await?;
    Ok(Json(resp))
}
