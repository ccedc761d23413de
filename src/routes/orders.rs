use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, patch, post},
};

use crate::{
    dto::orders::{
        CheckoutRequest, EmailBillRequest, EmailBillResult, OrderList, OrderWithItems,
        PlacedOrder, StaffCheckoutRequest, UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
    },
    error::AppResult,
    middleware::{auth::AuthUser, session::SessionContext},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{bill_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(staff_checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/status", patch(update_order_status))
        .route("/{id}/payment", patch(update_payment_status))
        .route("/{id}/bill", get(download_bill))
        .route("/{id}/bill/email", post(email_bill))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    params(("x-session-id" = String, Header, description = "Order session id")),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed from the session cart", body = ApiResponse<PlacedOrder>),
        (status = 400, description = "Empty cart or missing customer name"),
        (status = 409, description = "Insufficient inventory")
    ),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    session: SessionContext,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<PlacedOrder>>> {
    let resp = order_service::checkout(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    params(("x-session-id" = String, Header, description = "Order session id")),
    request_body = StaffCheckoutRequest,
    responses(
        (status = 200, description = "Order placed by staff", body = ApiResponse<PlacedOrder>),
        (status = 400, description = "Empty cart, missing customer name or invalid discount"),
        (status = 409, description = "Insufficient inventory")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn staff_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    session: SessionContext,
    Json(payload): Json<StaffCheckoutRequest>,
) -> AppResult<Json<ApiResponse<PlacedOrder>>> {
    let resp = order_service::staff_checkout(&state, &user, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Order history", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = String, Path, description = "Order id, e.g. ORD00001")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(("id" = String, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::update_order_status(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/payment",
    params(("id" = String, Path, description = "Order id")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::update_payment_status(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/bill",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "PDF bill", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn download_bill(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let pdf = bill_service::download_bill(&state, &user, &id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{id}.pdf\""),
            ),
        ],
        pdf,
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/bill/email",
    params(("id" = String, Path, description = "Order id")),
    request_body = EmailBillRequest,
    responses(
        (status = 200, description = "Delivery outcome; failures are listed in warnings", body = ApiResponse<EmailBillResult>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn email_bill(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<EmailBillRequest>,
) -> AppResult<Json<ApiResponse<EmailBillResult>>> {
    let resp = bill_service::email_bill(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}
