use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;

use crate::{
    audit,
    db::next_counter_value,
    dto::menu::{
        CreateMenuItemRequest, InventoryAdjustRequest, MenuBySection, MenuItemList,
        UpdateMenuItemRequest,
    },
    entity::menu_items::{ActiveModel, Column, Entity as MenuItems, Model as MenuItemModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{MenuItem, MenuSection},
    response::{ApiResponse, Meta},
    routes::params::LowStockQuery,
    state::AppState,
};

/// The public menu: available items only, grouped by section.
pub async fn list_menu(state: &AppState) -> AppResult<ApiResponse<MenuBySection>> {
    let items = MenuItems::find()
        .filter(Column::Available.eq(true))
        .order_by_asc(Column::Section)
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(menu_item_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Menu",
        MenuBySection::group(items),
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_menu_item(state: &AppState, id: &str) -> AppResult<ApiResponse<MenuItem>> {
    let item = MenuItems::find_by_id(id.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Menu item", menu_item_from_entity(item)?, None))
}

pub async fn create_menu_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    ensure_admin(user)?;
    validate_fields(
        Some(&payload.name),
        Some(&payload.category),
        Some(payload.price),
        Some(payload.inventory),
    )?;

    let txn = state.orm.begin().await?;
    let counter = format!("menu:{}", payload.section.id_prefix());
    let number = next_counter_value(&txn, &counter).await?;
    let id = payload.section.format_id(number);

    let item = ActiveModel {
        id: Set(id),
        section: Set(payload.section.as_str().to_string()),
        name: Set(payload.name.trim().to_string()),
        price: Set(payload.price),
        category: Set(payload.category.trim().to_string()),
        available: Set(payload.available),
        description: Set(payload.description.trim().to_string()),
        inventory: Set(payload.inventory),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_item_create",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item created",
        menu_item_from_entity(item)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    ensure_admin(user)?;
    validate_fields(
        payload.name.as_ref(),
        payload.category.as_ref(),
        payload.price,
        payload.inventory,
    )?;

    let existing = MenuItems::find_by_id(id.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(category) = payload.category {
        active.category = Set(category.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(inventory) = payload.inventory {
        active.inventory = Set(inventory);
    }
    if let Some(available) = payload.available {
        active.available = Set(available);
    }

    let item = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_item_update",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        menu_item_from_entity(item)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = MenuItems::delete_by_id(id.to_string())
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_item_delete",
        "menu_items",
        serde_json::json!({ "menu_item_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let item = MenuItems::find_by_id(id.to_string())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_inventory = item
        .inventory
        .checked_add(payload.delta)
        .filter(|inventory| *inventory >= 0)
        .ok_or_else(|| AppError::BadRequest("inventory cannot be negative".into()))?;

    let mut active: ActiveModel = item.into();
    active.inventory = Set(new_inventory);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "menu_items",
        serde_json::json!({ "menu_item_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        menu_item_from_entity(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<MenuItemList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = MenuItems::find()
        .filter(Column::Inventory.lte(threshold))
        .order_by_asc(Column::Inventory)
        .order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(menu_item_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Low stock",
        MenuItemList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

fn validate_fields(
    name: Option<&String>,
    category: Option<&String>,
    price: Option<Decimal>,
    inventory: Option<i32>,
) -> Result<(), AppError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if category.is_some_and(|c| c.trim().is_empty()) {
        return Err(AppError::BadRequest("category is required".into()));
    }
    if price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if inventory.is_some_and(|i| i < 0) {
        return Err(AppError::BadRequest("inventory must not be negative".into()));
    }
    Ok(())
}

pub(crate) fn menu_item_from_entity(model: MenuItemModel) -> AppResult<MenuItem> {
    let section: MenuSection = model
        .section
        .parse()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    Ok(MenuItem {
        id: model.id,
        section,
        name: model.name,
        price: model.price,
        category: model.category,
        available: model.available,
        description: model.description,
        inventory: model.inventory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_price_and_inventory() {
        assert!(validate_fields(None, None, Some(Decimal::new(-1, 2)), None).is_err());
        assert!(validate_fields(None, None, None, Some(-3)).is_err());
        assert!(validate_fields(None, None, Some(Decimal::ZERO), Some(0)).is_ok());
    }

    #[test]
    fn rejects_blank_names() {
        let blank = " ".to_string();
        let name = "Latte".to_string();
        assert!(validate_fields(Some(&blank), None, None, None).is_err());
        assert!(validate_fields(Some(&name), Some(&blank), None, None).is_err());
        assert!(validate_fields(Some(&name), Some(&name), None, None).is_ok());
    }
}
