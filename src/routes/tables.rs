use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, patch},
};

use crate::{
    dto::tables::{CreateTableRequest, MenuQrRequest, TableList, UpdateTableStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Table,
    response::ApiResponse,
    services::table_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tables).post(create_table))
        .route("/{table_number}", patch(update_table_status))
        .route("/{table_number}/qr", get(table_qr))
}

fn png(bytes: Vec<u8>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], bytes)
}

#[utoipa::path(
    get,
    path = "/api/tables",
    responses(
        (status = 200, description = "All tables", body = ApiResponse<TableList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Tables"
)]
pub async fn list_tables(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TableList>>> {
    let resp = table_service::list_tables(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tables",
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "Table created (admin only)", body = ApiResponse<Table>),
        (status = 400, description = "Duplicate or blank table number")
    ),
    security(("bearer_auth" = [])),
    tag = "Tables"
)]
pub async fn create_table(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTableRequest>,
) -> AppResult<Json<ApiResponse<Table>>> {
    let resp = table_service::create_table(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/tables/{table_number}",
    params(("table_number" = String, Path, description = "Table number")),
    request_body = UpdateTableStatusRequest,
    responses(
        (status = 200, description = "Table status updated", body = ApiResponse<Table>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tables"
)]
pub async fn update_table_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(table_number): Path<String>,
    Json(payload): Json<UpdateTableStatusRequest>,
) -> AppResult<Json<ApiResponse<Table>>> {
    let resp = table_service::update_table_status(&state, &user, &table_number, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tables/{table_number}/qr",
    params(("table_number" = String, Path, description = "Table number")),
    responses(
        (status = 200, description = "QR code linking to the menu for this table", content_type = "image/png", body = Vec<u8>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tables"
)]
pub async fn table_qr(
    State(state): State<AppState>,
    user: AuthUser,
    Path(table_number): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bytes = table_service::table_qr(&state, &user, &table_number).await?;
    Ok(png(bytes))
}

#[utoipa::path(
    get,
    path = "/api/qr",
    responses(
        (status = 200, description = "QR code for the configured menu URL", content_type = "image/png", body = Vec<u8>)
    ),
    security(("bearer_auth" = [])),
    tag = "Tables"
)]
pub async fn menu_qr(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let bytes = table_service::menu_qr(&state, &user).await?;
    Ok(png(bytes))
}

#[utoipa::path(
    put,
    path = "/api/qr",
    request_body = MenuQrRequest,
    responses(
        (status = 200, description = "Menu URL saved; QR code for it", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "Blank URL")
    ),
    security(("bearer_auth" = [])),
    tag = "Tables"
)]
pub async fn update_menu_qr(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MenuQrRequest>,
) -> AppResult<impl IntoResponse> {
    let bytes = table_service::update_menu_qr(&state, &user, payload).await?;
    Ok(png(bytes))
}
