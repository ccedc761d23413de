use std::collections::HashMap;

use chrono::{Local, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::{OrmConn, next_counter_value},
    dto::orders::{
        CheckoutRequest, OrderList, OrderWithItems, PlacedOrder, StaffCheckoutRequest,
        UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
    },
    entity::{
        cart_lines::{self, Entity as CartLines},
        menu_items::{self, Entity as MenuItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_staff},
        session::SessionContext,
    },
    models::{CartLine, Order, OrderItem, OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        bill_service,
        billing::{self, Rates},
        settings_service::load_settings,
    },
    state::AppState,
};

const ORDER_COUNTER: &str = "orders";

/// Everything needed to turn a session cart into an order.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub table_number: Option<String>,
    pub discount: Decimal,
    pub payment_status: PaymentStatus,
}

/// Customer self-order: no discount, unpaid, table taken from the session.
pub async fn checkout(
    state: &AppState,
    session: &SessionContext,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<PlacedOrder>> {
    let draft = OrderDraft {
        customer_name: payload.customer_name,
        customer_email: payload.customer_email,
        table_number: session.table_number().map(str::to_string),
        discount: Decimal::ZERO,
        payment_status: PaymentStatus::Unpaid,
    };
    place_order(state, None, session, draft).await
}

pub async fn staff_checkout(
    state: &AppState,
    user: &AuthUser,
    session: &SessionContext,
    payload: StaffCheckoutRequest,
) -> AppResult<ApiResponse<PlacedOrder>> {
    ensure_staff(user)?;
    let table_number = payload
        .table_number
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| session.table_number().map(str::to_string));
    let draft = OrderDraft {
        customer_name: payload.customer_name,
        customer_email: payload.customer_email,
        table_number,
        discount: payload.discount,
        payment_status: payload.payment_status.unwrap_or_default(),
    };
    place_order(state, Some(user), session, draft).await
}

async fn place_order(
    state: &AppState,
    user: Option<&AuthUser>,
    session: &SessionContext,
    draft: OrderDraft,
) -> AppResult<ApiResponse<PlacedOrder>> {
    let placed = commit_order(&state.orm, session.id(), draft).await?;

    audit::record(
        &state.pool,
        user.map(|u| u.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": placed.order.id, "total": placed.order.total }),
    )
    .await;

    // The order is committed; mail problems only produce a warning.
    let mut warning = None;
    let mut bill_emailed = false;
    if let Some(to) = placed.order.customer_email.clone() {
        let outcome = match load_settings(&state.orm).await {
            Ok(settings) => bill_service::send_bill(state, &placed, &settings, &to)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match outcome {
            Ok(()) => bill_emailed = true,
            Err(err) => {
                tracing::warn!(order_id = %placed.order.id, error = %err, "bill email failed");
                warning = Some(format!("bill email failed: {err}"));
            }
        }
    }

    let response = ApiResponse::success(
        "Order placed",
        PlacedOrder {
            order: placed.order,
            items: placed.items,
            bill_emailed,
        },
        Some(Meta::empty()),
    );
    Ok(match warning {
        Some(warning) => response.with_warning(warning),
        None => response,
    })
}

/// Convert the session cart into an order in one transaction.
///
/// Menu rows are locked in id order before the order counter, so concurrent
/// commits over the same stock serialize and cannot deadlock. Nothing is
/// written until every line has been checked; any error drops the
/// transaction, which rolls it back.
pub async fn commit_order(
    orm: &OrmConn,
    session_id: Uuid,
    draft: OrderDraft,
) -> AppResult<OrderWithItems> {
    let txn = orm.begin().await?;

    // Locking the cart makes a second commit of the same session wait and
    // then find the cart gone.
    let cart = CartLines::find()
        .filter(cart_lines::Column::SessionId.eq(session_id))
        .order_by_asc(cart_lines::Column::CreatedAt)
        .order_by_asc(cart_lines::Column::MenuItemId)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let customer_name = draft.customer_name.trim().to_string();
    if customer_name.is_empty() {
        return Err(AppError::MissingCustomerName);
    }
    let customer_email = draft
        .customer_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    let ids: Vec<String> = cart.iter().map(|line| line.menu_item_id.clone()).collect();
    let stock: HashMap<String, menu_items::Model> = MenuItems::find()
        .filter(menu_items::Column::Id.is_in(ids))
        .order_by_asc(menu_items::Column::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| (item.id.clone(), item))
        .collect();

    let lines: Vec<CartLine> = cart
        .into_iter()
        .map(|line| CartLine {
            subtotal: billing::line_subtotal(line.unit_price, line.quantity),
            menu_item_id: line.menu_item_id,
            name: line.name,
            unit_price: line.unit_price,
            quantity: line.quantity,
        })
        .collect();

    for line in &lines {
        let available = match stock.get(&line.menu_item_id) {
            Some(item) if item.available => item.inventory,
            _ => 0,
        };
        if line.quantity > available {
            return Err(AppError::InsufficientInventory {
                item: line.name.clone(),
                requested: line.quantity,
                available,
            });
        }
    }

    let settings = load_settings(&txn).await?;
    let totals = billing::compute_totals(&lines, draft.discount, &Rates::from(&settings))?;

    for line in &lines {
        decrement_inventory(&txn, line).await?;
    }

    let number = next_counter_value(&txn, ORDER_COUNTER).await?;
    let order_id = billing::format_order_id(number);
    let now = Utc::now();
    let local = now.with_timezone(&Local).naive_local();

    let order = OrderActive {
        id: Set(order_id.clone()),
        customer_name: Set(customer_name),
        customer_email: Set(customer_email),
        table_number: Set(draft.table_number),
        subtotal: Set(totals.subtotal),
        discount: Set(totals.discount),
        tax: Set(totals.tax),
        service_charge: Set(totals.service_charge),
        total: Set(totals.total),
        tax_rate: Set(settings.tax_rate),
        service_charge_rate: Set(settings.service_charge_rate),
        order_date: Set(local.date()),
        order_time: Set(local.time()),
        created_at: Set(now.into()),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_status: Set(draft.payment_status.as_str().to_string()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (position, line) in lines.into_iter().enumerate() {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id.clone()),
            position: Set(position as i32),
            menu_item_id: Set(line.menu_item_id),
            name: Set(line.name),
            unit_price: Set(line.unit_price),
            quantity: Set(line.quantity),
            subtotal: Set(line.subtotal),
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    CartLines::delete_many()
        .filter(cart_lines::Column::SessionId.eq(session_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let order = order_from_entity(order)?;
    tracing::info!(
        order_id = %order.id,
        total = %order.total,
        lines = items.len(),
        "order committed"
    );
    Ok(OrderWithItems { order, items })
}

async fn decrement_inventory(txn: &DatabaseTransaction, line: &CartLine) -> AppResult<()> {
    let result = MenuItems::update_many()
        .col_expr(
            menu_items::Column::Inventory,
            Expr::col(menu_items::Column::Inventory).sub(line.quantity),
        )
        .filter(menu_items::Column::Id.eq(line.menu_item_id.as_str()))
        .filter(menu_items::Column::Inventory.gte(line.quantity))
        .exec(txn)
        .await?;
    if result.rows_affected != 1 {
        return Err(AppError::InsufficientInventory {
            item: line.name.clone(),
            requested: line.quantity,
            available: 0,
        });
    }
    Ok(())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(date) = query.date {
        condition = condition.add(OrderCol::OrderDate.eq(date));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder
            .order_by_asc(OrderCol::CreatedAt)
            .order_by_asc(OrderCol::Id),
        SortOrder::Desc => finder
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;
    let order = load_order_with_items(&state.orm, id).await?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;
    let current: OrderStatus = order.status.parse()?;
    let next = payload.status;

    if !current.can_transition_to(next) {
        return Err(AppError::InvalidStatusTransition {
            from: current.to_string(),
            to: next.to_string(),
        });
    }

    let order = if current == next {
        order
    } else {
        let mut active: OrderActive = order.into();
        active.status = Set(next.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?
    };
    let items = load_items(&txn, &order.id).await?;
    txn.commit().await?;

    if current != next {
        tracing::info!(order_id = %order.id, from = %current, to = %next, "order status changed");
        audit::record(
            &state.pool,
            Some(user.user_id),
            "order_status_update",
            "orders",
            serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Order status updated",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Payment status may move freely between values.
pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdatePaymentStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;
    let current: PaymentStatus = order.payment_status.parse()?;
    let next = payload.payment_status;

    let order = if current == next {
        order
    } else {
        let mut active: OrderActive = order.into();
        active.payment_status = Set(next.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?
    };
    let items = load_items(&txn, &order.id).await?;
    txn.commit().await?;

    if current != next {
        audit::record(
            &state.pool,
            Some(user.user_id),
            "order_payment_update",
            "orders",
            serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Payment status updated",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn load_order_with_items<C: ConnectionTrait>(
    conn: &C,
    id: &str,
) -> AppResult<OrderWithItems> {
    let order = Orders::find_by_id(id.to_string())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = load_items(conn, &order.id).await?;
    Ok(OrderWithItems {
        order: order_from_entity(order)?,
        items,
    })
}

/// Orders matching `condition` with their items, oldest first.
pub async fn load_orders_with_items<C: ConnectionTrait>(
    conn: &C,
    condition: Condition,
) -> AppResult<Vec<OrderWithItems>> {
    let orders = Orders::find()
        .filter(condition)
        .order_by_asc(OrderCol::CreatedAt)
        .order_by_asc(OrderCol::Id)
        .all(conn)
        .await?;
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = orders.iter().map(|o| o.id.clone()).collect();
    let mut items_by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .order_by_asc(OrderItemCol::OrderId)
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?
    {
        items_by_order
            .entry(item.order_id.clone())
            .or_default()
            .push(order_item_from_entity(item));
    }

    orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            Ok(OrderWithItems {
                order: order_from_entity(order)?,
                items,
            })
        })
        .collect()
}

async fn lock_order(txn: &DatabaseTransaction, id: &str) -> AppResult<OrderModel> {
    Orders::find_by_id(id.to_string())
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn load_items<C: ConnectionTrait>(conn: &C, order_id: &str) -> AppResult<Vec<OrderItem>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect())
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        status: model.status.parse()?,
        payment_status: model.payment_status.parse()?,
        id: model.id,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        table_number: model.table_number,
        subtotal: model.subtotal,
        discount: model.discount,
        tax: model.tax,
        service_charge: model.service_charge,
        total: model.total,
        tax_rate: model.tax_rate,
        service_charge_rate: model.service_charge_rate,
        date: model.order_date,
        time: model.order_time,
        timestamp: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        menu_item_id: model.menu_item_id,
        name: model.name,
        unit_price: model.unit_price,
        quantity: model.quantity,
        subtotal: model.subtotal,
    }
}
