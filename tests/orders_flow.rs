use std::sync::Mutex;

use cafe_pos_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        analytics::AnalyticsQuery,
        cart::{AddToCartRequest, StartSessionRequest},
        menu::InventoryAdjustRequest,
        orders::{
            CheckoutRequest, EmailBillRequest, StaffCheckoutRequest, UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
        },
        tables::MenuQrRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    middleware::{auth::AuthUser, session::SessionContext},
    models::{OrderStatus, PaymentStatus},
    routes::params::OrderListQuery,
    services::{
        analytics_service, bill_service, cart_service, menu_service, order_service,
        settings_service, table_service,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use std::str::FromStr;
use uuid::Uuid;

// Tests in this file share one database and truncate it; run them one at a time.
static DB_LOCK: Mutex<()> = Mutex::new(());

fn database_url() -> Option<String> {
    // Allow skipping when no DB is configured in the environment.
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// Integration flow: customer fills a table cart and checks out; staff moves the
// order along, marks it paid and pulls the bill; admin reads analytics.
#[tokio::test]
async fn customer_checkout_and_staff_flow() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    let staff = create_user(&state, "staff").await?;
    let admin = create_user(&state, "admin").await?;

    insert_item(&state, "BEV001", "Espresso", "2.50", 10).await?;
    insert_item(&state, "FOOD001", "Croissant", "4.00", 5).await?;

    let session = start_session(&state, Some("3")).await?;
    add(&state, &session, "BEV001", 1).await?;
    add(&state, &session, "FOOD001", 1).await?;
    // Merges into the existing line.
    let cart = add(&state, &session, "BEV001", 1).await?;
    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.totals.subtotal, dec("9.00"));
    assert_eq!(cart.totals.total, dec("10.35"));

    let placed = order_service::checkout(
        &state,
        &session,
        CheckoutRequest {
            customer_name: "  Asha ".into(),
            customer_email: None,
        },
    )
    .await?
    .data
    .unwrap();

    let order = placed.order;
    assert_eq!(order.id, "ORD00001");
    assert_eq!(order.customer_name, "Asha");
    assert_eq!(order.table_number.as_deref(), Some("3"));
    assert_eq!(order.subtotal, dec("9.00"));
    assert_eq!(order.tax, dec("0.90"));
    assert_eq!(order.service_charge, dec("0.45"));
    assert_eq!(order.total, dec("10.35"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(placed.items.len(), 2);
    assert!(!placed.bill_emailed);

    assert_eq!(inventory(&state, "BEV001").await?, 8);
    assert_eq!(inventory(&state, "FOOD001").await?, 4);
    assert!(cart_service::load_cart_lines(&state.pool, session.id()).await?.is_empty());

    // Status: forward, same-status no-op, then no way back.
    let updated = order_service::update_order_status(
        &state,
        &staff,
        &order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Ready },
    )
    .await?;
    assert_eq!(updated.data.unwrap().order.status, OrderStatus::Ready);

    order_service::update_order_status(
        &state,
        &staff,
        &order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Ready },
    )
    .await?;

    let back = order_service::update_order_status(
        &state,
        &staff,
        &order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Pending },
    )
    .await;
    assert!(matches!(back, Err(AppError::InvalidStatusTransition { .. })));

    let paid = order_service::update_payment_status(
        &state,
        &staff,
        &order.id,
        UpdatePaymentStatusRequest { payment_status: PaymentStatus::Paid },
    )
    .await?;
    assert_eq!(paid.data.unwrap().order.payment_status, PaymentStatus::Paid);

    let pdf = bill_service::download_bill(&state, &staff, &order.id).await?;
    assert!(pdf.starts_with(b"%PDF"));

    let listed = order_service::list_orders(
        &state,
        &staff,
        OrderListQuery {
            status: Some(OrderStatus::Ready),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(listed.data.unwrap().items.len(), 1);

    let summary = analytics_service::sales_summary(
        &state,
        &admin,
        AnalyticsQuery {
            start: Some(order.date),
            end: Some(order.date),
            top: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(summary.order_count, 1);
    assert_eq!(summary.total_revenue, dec("10.35"));
    assert_eq!(summary.top_items[0].name, "Espresso");
    assert_eq!(summary.top_items[0].quantity, 2);

    // Staff cannot read admin analytics.
    let denied = analytics_service::sales_summary(&state, &staff, AnalyticsQuery::default()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn sequential_commits_number_orders_without_gaps() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    let staff = create_user(&state, "staff").await?;
    insert_item(&state, "BEV001", "Espresso", "2.50", 100).await?;

    // A rejected commit does not consume a number.
    let session = start_session(&state, None).await?;
    add(&state, &session, "BEV001", 1).await?;
    let rejected = order_service::staff_checkout(
        &state,
        &staff,
        &session,
        StaffCheckoutRequest {
            customer_name: "Walk-in".into(),
            customer_email: None,
            table_number: None,
            discount: dec("5.00"),
            payment_status: None,
        },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::InvalidDiscount(_))));

    for expected in ["ORD00001", "ORD00002", "ORD00003"] {
        let session = start_session(&state, None).await?;
        add(&state, &session, "BEV001", 2).await?;
        let placed = order_service::staff_checkout(
            &state,
            &staff,
            &session,
            StaffCheckoutRequest {
                customer_name: "Walk-in".into(),
                customer_email: None,
                table_number: Some("7".into()),
                discount: dec("1.00"),
                payment_status: Some(PaymentStatus::Paid),
            },
        )
        .await?
        .data
        .unwrap();
        assert_eq!(placed.order.id, expected);
        assert_eq!(placed.order.discount, dec("1.00"));
        assert_eq!(placed.order.total, dec("4.60"));
        assert_eq!(placed.order.payment_status, PaymentStatus::Paid);
    }

    Ok(())
}

#[tokio::test]
async fn shortfall_on_any_line_leaves_everything_unchanged() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    let admin = create_user(&state, "admin").await?;
    insert_item(&state, "BEV001", "Espresso", "2.50", 10).await?;
    insert_item(&state, "FOOD001", "Croissant", "4.00", 3).await?;

    let session = start_session(&state, None).await?;
    add(&state, &session, "BEV001", 2).await?;
    add(&state, &session, "FOOD001", 3).await?;

    // Stock drops after the croissants were carted.
    menu_service::adjust_inventory(&state, &admin, "FOOD001", InventoryAdjustRequest { delta: -1 })
        .await?;

    let result = order_service::checkout(
        &state,
        &session,
        CheckoutRequest {
            customer_name: "Asha".into(),
            customer_email: None,
        },
    )
    .await;
    match result {
        Err(AppError::InsufficientInventory { item, requested, available }) => {
            assert_eq!(item, "Croissant");
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected insufficient inventory, got {other:?}"),
    }

    assert_eq!(inventory(&state, "BEV001").await?, 10);
    assert_eq!(inventory(&state, "FOOD001").await?, 2);
    assert_eq!(order_count(&state).await?, 0);
    assert_eq!(cart_service::load_cart_lines(&state.pool, session.id()).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn commit_preconditions_are_checked() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    insert_item(&state, "BEV001", "Espresso", "2.50", 10).await?;

    let session = start_session(&state, None).await?;
    let empty = order_service::checkout(
        &state,
        &session,
        CheckoutRequest {
            customer_name: "Asha".into(),
            customer_email: None,
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::EmptyCart)));

    add(&state, &session, "BEV001", 1).await?;
    let nameless = order_service::checkout(
        &state,
        &session,
        CheckoutRequest {
            customer_name: "   ".into(),
            customer_email: None,
        },
    )
    .await;
    assert!(matches!(nameless, Err(AppError::MissingCustomerName)));
    assert_eq!(inventory(&state, "BEV001").await?, 10);

    // Unknown table numbers are rejected when a session starts.
    let bad_table = cart_service::start_session(
        &state,
        StartSessionRequest {
            table_number: Some("99".into()),
        },
    )
    .await;
    assert!(matches!(bad_table, Err(AppError::NotFound)));

    Ok(())
}

#[tokio::test]
async fn adding_beyond_inventory_leaves_cart_unchanged() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    insert_item(&state, "FOOD001", "Croissant", "4.00", 3).await?;

    let session = start_session(&state, None).await?;
    add(&state, &session, "FOOD001", 2).await?;

    let over = cart_service::add_to_cart(
        &state,
        &session,
        AddToCartRequest {
            menu_item_id: "FOOD001".into(),
            quantity: 2,
        },
    )
    .await;
    assert!(matches!(over, Err(AppError::InsufficientInventory { .. })));

    let zero = cart_service::add_to_cart(
        &state,
        &session,
        AddToCartRequest {
            menu_item_id: "FOOD001".into(),
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    let unknown = cart_service::add_to_cart(
        &state,
        &session,
        AddToCartRequest {
            menu_item_id: "FOOD999".into(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound)));

    let lines = cart_service::load_cart_lines(&state.pool, session.id()).await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);

    // Removing twice is fine.
    cart_service::remove_from_cart(&state, &session, "FOOD001").await?;
    cart_service::remove_from_cart(&state, &session, "FOOD001").await?;
    assert!(cart_service::load_cart_lines(&state.pool, session.id()).await?.is_empty());

    Ok(())
}

// Mail is not configured in tests, so every send fails; the order must stand.
#[tokio::test]
async fn failed_bill_email_does_not_undo_the_order() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    let staff = create_user(&state, "staff").await?;
    insert_item(&state, "BEV001", "Espresso", "2.50", 5).await?;

    let session = start_session(&state, None).await?;
    add(&state, &session, "BEV001", 2).await?;

    let resp = order_service::checkout(
        &state,
        &session,
        CheckoutRequest {
            customer_name: "Asha".into(),
            customer_email: Some("asha@example.com".into()),
        },
    )
    .await?;
    assert!(!resp.warnings.is_empty());
    assert!(resp.warnings[0].contains("bill email failed"));
    let placed = resp.data.unwrap();
    assert!(!placed.bill_emailed);
    assert_eq!(placed.order.customer_email.as_deref(), Some("asha@example.com"));

    assert_eq!(order_count(&state).await?, 1);
    assert_eq!(inventory(&state, "BEV001").await?, 3);
    let stored = order_service::get_order(&state, &staff, &placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(stored.order.total, placed.order.total);

    let emailed = bill_service::email_bill(
        &state,
        &staff,
        &placed.order.id,
        EmailBillRequest {
            to: "asha@example.com".into(),
        },
    )
    .await?;
    assert_eq!(emailed.warnings.len(), 1);
    let result = emailed.data.unwrap();
    assert!(!result.sent);
    assert_eq!(result.order_id, placed.order.id);

    Ok(())
}

#[tokio::test]
async fn stale_empty_sessions_are_removed_when_a_session_starts() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    insert_item(&state, "BEV001", "Espresso", "2.50", 5).await?;

    let stale_empty = start_session(&state, None).await?;
    let stale_with_cart = start_session(&state, None).await?;
    add(&state, &stale_with_cart, "BEV001", 1).await?;
    let recent = start_session(&state, None).await?;
    for session in [&stale_empty, &stale_with_cart] {
        sqlx::query("UPDATE order_sessions SET created_at = NOW() - INTERVAL '2 days' WHERE id = $1")
            .bind(session.id())
            .execute(&state.pool)
            .await?;
    }

    start_session(&state, None).await?;

    assert!(!session_exists(&state, stale_empty.id()).await?);
    assert!(session_exists(&state, stale_with_cart.id()).await?);
    assert!(session_exists(&state, recent.id()).await?);

    Ok(())
}

#[tokio::test]
async fn public_menu_hides_unavailable_items() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    insert_item(&state, "BEV001", "Espresso", "2.50", 5).await?;
    insert_item(&state, "BEV002", "Latte", "4.00", 5).await?;
    insert_item(&state, "FOOD001", "Croissant", "4.00", 5).await?;
    sqlx::query("UPDATE menu_items SET available = FALSE WHERE id = 'BEV002'")
        .execute(&state.pool)
        .await?;

    let menu = menu_service::list_menu(&state).await?.data.unwrap();
    let ids: Vec<&str> = menu
        .sections
        .values()
        .flatten()
        .map(|item| item.id.as_str())
        .collect();
    assert_eq!(ids, vec!["BEV001", "FOOD001"]);

    Ok(())
}

#[tokio::test]
async fn menu_qr_update_saves_the_url() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    let staff = create_user(&state, "staff").await?;

    let blank = table_service::update_menu_qr(
        &state,
        &staff,
        MenuQrRequest { url: "  ".into() },
    )
    .await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    let png = table_service::update_menu_qr(
        &state,
        &staff,
        MenuQrRequest {
            url: " https://cafe.test/menu ".into(),
        },
    )
    .await?;
    assert!(png.starts_with(b"\x89PNG"));
    let settings = settings_service::load_settings(&state.orm).await?;
    assert_eq!(settings.menu_url, "https://cafe.test/menu");

    // Reading the QR code leaves settings alone.
    let again = table_service::menu_qr(&state, &staff).await?;
    assert_eq!(again, png);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_commits_cannot_oversell_the_last_item() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let state = setup_state(&database_url).await?;
    insert_item(&state, "FOOD005", "Margherita Pizza", "12.00", 1).await?;

    let first = start_session(&state, None).await?;
    let second = start_session(&state, None).await?;
    add(&state, &first, "FOOD005", 1).await?;
    add(&state, &second, "FOOD005", 1).await?;

    let request = || CheckoutRequest {
        customer_name: "Guest".into(),
        customer_email: None,
    };
    let (a, b) = tokio::join!(
        order_service::checkout(&state, &first, request()),
        order_service::checkout(&state, &second, request()),
    );

    let outcomes = [a, b];
    let placed: Vec<_> = outcomes.iter().filter(|r| r.is_ok()).collect();
    let short = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientInventory { .. })))
        .count();
    assert_eq!(placed.len(), 1);
    assert_eq!(short, 1);

    assert_eq!(inventory(&state, "FOOD005").await?, 0);
    assert_eq!(order_count(&state).await?, 1);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_lines, order_sessions, menu_items, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;
    orm.execute(Statement::from_string(backend, "DELETE FROM counters"))
        .await?;

    Ok(AppState {
        pool,
        orm,
        mailer: None,
    })
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(format!("{role}-{}", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

async fn insert_item(
    state: &AppState,
    id: &str,
    name: &str,
    price: &str,
    inventory: i32,
) -> anyhow::Result<()> {
    let section = if id.starts_with("BEV") { "beverages" } else { "food" };
    sqlx::query(
        r#"
        INSERT INTO menu_items (id, section, name, price, category, available, description, inventory)
        VALUES ($1, $2, $3, $4, 'Test', TRUE, '', $5)
        "#,
    )
    .bind(id)
    .bind(section)
    .bind(name)
    .bind(dec(price))
    .bind(inventory)
    .execute(&state.pool)
    .await?;
    Ok(())
}

async fn start_session(state: &AppState, table: Option<&str>) -> anyhow::Result<SessionContext> {
    let session = cart_service::start_session(
        state,
        StartSessionRequest {
            table_number: table.map(str::to_string),
        },
    )
    .await?
    .data
    .unwrap();
    Ok(SessionContext(session))
}

async fn add(
    state: &AppState,
    session: &SessionContext,
    menu_item_id: &str,
    quantity: i32,
) -> anyhow::Result<cafe_pos_api::dto::cart::CartView> {
    let view = cart_service::add_to_cart(
        state,
        session,
        AddToCartRequest {
            menu_item_id: menu_item_id.into(),
            quantity,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(view)
}

async fn inventory(state: &AppState, id: &str) -> anyhow::Result<i32> {
    let (inventory,): (i32,) = sqlx::query_as("SELECT inventory FROM menu_items WHERE id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    Ok(inventory)
}

async fn order_count(state: &AppState) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}

async fn session_exists(state: &AppState, id: Uuid) -> anyhow::Result<bool> {
    let (found,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM order_sessions WHERE id = $1)")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    Ok(found)
}
