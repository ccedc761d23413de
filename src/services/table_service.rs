use crate::{
    audit,
    db::DbPool,
    dto::tables::{CreateTableRequest, MenuQrRequest, TableList, UpdateTableStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::{Table, TableStatus},
    response::{ApiResponse, Meta},
    services::{qr_service, settings_service},
    state::AppState,
};

pub async fn ensure_table_exists(pool: &DbPool, table_number: &str) -> AppResult<()> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT table_number FROM cafe_tables WHERE table_number = $1")
            .bind(table_number)
            .fetch_optional(pool)
            .await?;
    if found.is_none() {
        tracing::debug!(table = table_number, "unknown table");
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn list_tables(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<TableList>> {
    ensure_staff(user)?;
    // Numeric table names sort numerically, the rest alphabetically after them.
    let items = sqlx::query_as::<_, Table>(
        r#"
        SELECT table_number, status FROM cafe_tables
        ORDER BY (table_number ~ '^[0-9]+$') DESC,
                 CASE WHEN table_number ~ '^[0-9]+$' THEN table_number::BIGINT END,
                 table_number
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Tables",
        TableList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_table(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTableRequest,
) -> AppResult<ApiResponse<Table>> {
    ensure_admin(user)?;
    let table_number = payload.table_number.trim();
    if table_number.is_empty() {
        return Err(AppError::BadRequest("table_number is required".into()));
    }

    let table = sqlx::query_as::<_, Table>(
        r#"
        INSERT INTO cafe_tables (table_number, status) VALUES ($1, $2)
        ON CONFLICT (table_number) DO NOTHING
        RETURNING table_number, status
        "#,
    )
    .bind(table_number)
    .bind(TableStatus::Available.as_str())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::BadRequest(format!("table {table_number} already exists")))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "table_create",
        "cafe_tables",
        serde_json::json!({ "table_number": table.table_number }),
    )
    .await;

    Ok(ApiResponse::success("Table created", table, Some(Meta::empty())))
}

pub async fn update_table_status(
    state: &AppState,
    user: &AuthUser,
    table_number: &str,
    payload: UpdateTableStatusRequest,
) -> AppResult<ApiResponse<Table>> {
    ensure_staff(user)?;
    let table = sqlx::query_as::<_, Table>(
        r#"
        UPDATE cafe_tables SET status = $2
        WHERE table_number = $1
        RETURNING table_number, status
        "#,
    )
    .bind(table_number)
    .bind(payload.status.as_str())
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "table_status_update",
        "cafe_tables",
        serde_json::json!({ "table_number": table.table_number, "status": table.status }),
    )
    .await;

    Ok(ApiResponse::success("Table updated", table, Some(Meta::empty())))
}

/// PNG QR code pointing at the menu with this table pre-selected.
pub async fn table_qr(state: &AppState, user: &AuthUser, table_number: &str) -> AppResult<Vec<u8>> {
    ensure_staff(user)?;
    ensure_table_exists(&state.pool, table_number).await?;
    let settings = settings_service::load_settings(&state.orm).await?;
    let link = qr_service::table_link(&settings.menu_url, table_number);
    Ok(qr_service::render_png(&link, None)?)
}

/// PNG QR code for the configured menu URL.
pub async fn menu_qr(state: &AppState, user: &AuthUser) -> AppResult<Vec<u8>> {
    ensure_staff(user)?;
    let settings = settings_service::load_settings(&state.orm).await?;
    Ok(qr_service::render_png(&settings.menu_url, None)?)
}

/// Save a new menu URL and return its QR code.
pub async fn update_menu_qr(
    state: &AppState,
    user: &AuthUser,
    payload: MenuQrRequest,
) -> AppResult<Vec<u8>> {
    ensure_staff(user)?;
    let url = payload.url.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("url is required".into()));
    }
    let png = qr_service::render_png(url, None)?;
    settings_service::set_menu_url(state, url).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_url_update",
        "settings",
        serde_json::json!({ "menu_url": url }),
    )
    .await;

    Ok(png)
}
