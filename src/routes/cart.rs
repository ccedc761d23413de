use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};

use crate::{
    dto::cart::{AddToCartRequest, CartView, StartSessionRequest},
    error::AppResult,
    middleware::session::SessionContext,
    models::OrderSession,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn session_router() -> Router<AppState> {
    Router::new().route("/", post(start_session))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).post(add_to_cart).delete(clear_cart))
        .route("/{menu_item_id}", delete(remove_from_cart))
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "New order session; send its id as X-Session-Id", body = ApiResponse<OrderSession>),
        (status = 404, description = "Unknown table")
    ),
    tag = "Cart"
)]
pub async fn start_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> AppResult<Json<ApiResponse<OrderSession>>> {
    let resp = cart_service::start_session(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(("x-session-id" = String, Header, description = "Order session id")),
    responses(
        (status = 200, description = "Cart lines with a totals preview", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown session")
    ),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    session: SessionContext,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::view_cart(&state, &session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    params(("x-session-id" = String, Header, description = "Order session id")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added or merged", body = ApiResponse<CartView>),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Unknown menu item"),
        (status = 409, description = "Insufficient inventory")
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: SessionContext,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::add_to_cart(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{menu_item_id}",
    params(
        ("x-session-id" = String, Header, description = "Order session id"),
        ("menu_item_id" = String, Path, description = "Menu item id of the line")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: SessionContext,
    Path(menu_item_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::remove_from_cart(&state, &session, &menu_item_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    params(("x-session-id" = String, Header, description = "Order session id")),
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    session: SessionContext,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::clear_cart(&state, &session).await?;
    Ok(Json(resp))
}
