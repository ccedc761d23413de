use sea_orm::{Condition, EntityTrait, QueryOrder};

use crate::{
    dto::{menu::MenuBySection, orders::OrderWithItems},
    entity::{MenuItems, menu_items::Column},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    services::{menu_service::menu_item_from_entity, order_service},
    state::AppState,
};

/// The whole menu, unavailable items included, grouped by section.
pub async fn export_menu(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MenuBySection>> {
    ensure_admin(user)?;
    let items = MenuItems::find()
        .order_by_asc(Column::Section)
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(menu_item_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    let total = items.len() as i64;
    tracing::info!(items = total, "menu exported");
    Ok(ApiResponse::success(
        "Menu export",
        MenuBySection::group(items),
        Some(Meta::new(1, total, total)),
    ))
}

/// Full order history with line items, oldest first.
pub async fn export_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<OrderWithItems>>> {
    ensure_admin(user)?;
    let orders = order_service::load_orders_with_items(&state.orm, Condition::all()).await?;
    let total = orders.len() as i64;
    tracing::info!(orders = total, "orders exported");
    Ok(ApiResponse::success(
        "Order export",
        orders,
        Some(Meta::new(1, total, total)),
    ))
}
