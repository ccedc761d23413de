use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::cart::{AddToCartRequest, CartView, StartSessionRequest},
    error::{AppError, AppResult},
    middleware::session::SessionContext,
    models::{CartLine, OrderSession},
    response::{ApiResponse, Meta},
    services::{
        billing::{self, Rates},
        settings_service::load_settings,
        table_service::ensure_table_exists,
    },
    state::AppState,
};

/// Sessions older than this with nothing in the cart are dropped.
pub const SESSION_RETENTION_HOURS: i32 = 24;

#[derive(FromRow)]
struct CartLineRow {
    menu_item_id: String,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            subtotal: billing::line_subtotal(row.unit_price, row.quantity),
            menu_item_id: row.menu_item_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

#[derive(FromRow)]
struct MenuStockRow {
    name: String,
    price: Decimal,
    available: bool,
    inventory: i32,
}

/// Delete sessions older than `hours` whose cart is empty, which covers every
/// session that has already checked out. Returns how many were removed.
pub async fn purge_stale_sessions(pool: &DbPool, hours: i32) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM order_sessions s
        WHERE s.created_at < NOW() - make_interval(hours => $1)
          AND NOT EXISTS (SELECT 1 FROM cart_lines c WHERE c.session_id = s.id)
        "#,
    )
    .bind(hours)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Open a new order session, optionally bound to a table (from a table QR link).
pub async fn start_session(
    state: &AppState,
    payload: StartSessionRequest,
) -> AppResult<ApiResponse<OrderSession>> {
    let table_number = payload
        .table_number
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(table) = table_number.as_deref() {
        ensure_table_exists(&state.pool, table).await?;
    }

    let session = sqlx::query_as::<_, OrderSession>(
        r#"
        INSERT INTO order_sessions (id, table_number)
        VALUES ($1, $2)
        RETURNING id, table_number, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(table_number)
    .fetch_one(&state.pool)
    .await?;

    tracing::debug!(session_id = %session.id, table = ?session.table_number, "order session started");

    match purge_stale_sessions(&state.pool, SESSION_RETENTION_HOURS).await {
        Ok(0) => {}
        Ok(removed) => tracing::debug!(removed, "stale order sessions removed"),
        Err(err) => tracing::warn!(error = %err, "failed to remove stale order sessions"),
    }
    Ok(ApiResponse::success("Session started", session, Some(Meta::empty())))
}

pub async fn load_cart_lines(pool: &DbPool, session_id: Uuid) -> AppResult<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT menu_item_id, name, unit_price, quantity
        FROM cart_lines
        WHERE session_id = $1
        ORDER BY created_at, menu_item_id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

pub async fn view_cart(
    state: &AppState,
    session: &SessionContext,
) -> AppResult<ApiResponse<CartView>> {
    let view = build_view(state, session).await?;
    let total = view.lines.len() as i64;
    Ok(ApiResponse::success("OK", view, Some(Meta::new(1, total, total))))
}

pub async fn add_to_cart(
    state: &AppState,
    session: &SessionContext,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let item = sqlx::query_as::<_, MenuStockRow>(
        "SELECT name, price, available, inventory FROM menu_items WHERE id = $1",
    )
    .bind(payload.menu_item_id.as_str())
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;
    if !item.available {
        return Err(AppError::BadRequest(format!("{} is not available", item.name)));
    }

    let in_cart: Option<(i32,)> = sqlx::query_as(
        "SELECT quantity FROM cart_lines WHERE session_id = $1 AND menu_item_id = $2",
    )
    .bind(session.id())
    .bind(payload.menu_item_id.as_str())
    .fetch_optional(&state.pool)
    .await?;
    let in_cart = in_cart.map(|(q,)| q).unwrap_or(0);
    check_stock(&item.name, payload.quantity, in_cart, item.inventory)?;

    // The guard on the merge keeps concurrent adds from overshooting the stock
    // read above; a missing row means the guard rejected the merge.
    let merged: Option<(i32,)> = sqlx::query_as(
        r#"
        INSERT INTO cart_lines (id, session_id, menu_item_id, name, unit_price, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (session_id, menu_item_id)
        DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
        WHERE cart_lines.quantity + EXCLUDED.quantity <= $7
        RETURNING quantity
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session.id())
    .bind(payload.menu_item_id.as_str())
    .bind(item.name.as_str())
    .bind(item.price)
    .bind(payload.quantity)
    .bind(item.inventory)
    .fetch_optional(&state.pool)
    .await?;

    if merged.is_none() {
        return Err(AppError::InsufficientInventory {
            item: item.name,
            requested: payload.quantity,
            available: item.inventory,
        });
    }

    let view = build_view(state, session).await?;
    Ok(ApiResponse::success("Added to cart", view, None))
}

/// Removing a line that is already gone is not an error.
pub async fn remove_from_cart(
    state: &AppState,
    session: &SessionContext,
    menu_item_id: &str,
) -> AppResult<ApiResponse<CartView>> {
    sqlx::query("DELETE FROM cart_lines WHERE session_id = $1 AND menu_item_id = $2")
        .bind(session.id())
        .bind(menu_item_id)
        .execute(&state.pool)
        .await?;

    let view = build_view(state, session).await?;
    Ok(ApiResponse::success("Removed from cart", view, Some(Meta::empty())))
}

pub async fn clear_cart(
    state: &AppState,
    session: &SessionContext,
) -> AppResult<ApiResponse<CartView>> {
    sqlx::query("DELETE FROM cart_lines WHERE session_id = $1")
        .bind(session.id())
        .execute(&state.pool)
        .await?;

    let view = build_view(state, session).await?;
    Ok(ApiResponse::success("Cart cleared", view, Some(Meta::empty())))
}

async fn build_view(state: &AppState, session: &SessionContext) -> AppResult<CartView> {
    let lines = load_cart_lines(&state.pool, session.id()).await?;
    let settings = load_settings(&state.orm).await?;
    let totals = billing::compute_totals(&lines, Decimal::ZERO, &Rates::from(&settings))?;
    Ok(CartView {
        session_id: session.id(),
        table_number: session.table_number().map(str::to_string),
        lines,
        totals,
    })
}

fn check_stock(name: &str, requested: i32, in_cart: i32, inventory: i32) -> AppResult<()> {
    let wanted = in_cart.saturating_add(requested);
    if wanted > inventory {
        return Err(AppError::InsufficientInventory {
            item: name.to_string(),
            requested: wanted,
            available: inventory,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_check_counts_what_is_already_in_the_cart() {
        assert!(check_stock("Latte", 2, 0, 2).is_ok());
        assert!(check_stock("Latte", 1, 2, 2).is_err());
    }

    #[test]
    fn stock_shortfall_reports_merged_quantity() {
        match check_stock("Croissant", 3, 2, 4) {
            Err(AppError::InsufficientInventory {
                item,
                requested,
                available,
            }) => {
                assert_eq!(item, "Croissant");
                assert_eq!(requested, 5);
                assert_eq!(available, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cart_rows_carry_rounded_subtotals() {
        let line = CartLine::from(CartLineRow {
            menu_item_id: "BEV001".into(),
            name: "Espresso".into(),
            unit_price: Decimal::new(250, 2),
            quantity: 3,
        });
        assert_eq!(line.subtotal, Decimal::new(750, 2));
    }
}
