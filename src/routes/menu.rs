use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::menu::MenuBySection,
    error::AppResult,
    models::MenuItem,
    response::ApiResponse,
    services::menu_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menu))
        .route("/{id}", get(get_menu_item))
}

#[utoipa::path(
    get,
    path = "/api/menu",
    responses(
        (status = 200, description = "Available items grouped by section", body = ApiResponse<MenuBySection>)
    ),
    tag = "Menu"
)]
pub async fn list_menu(State(state): State<AppState>) -> AppResult<Json<ApiResponse<MenuBySection>>> {
    let resp = menu_service::list_menu(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/menu/{id}",
    params(("id" = String, Path, description = "Menu item id, e.g. BEV001")),
    responses(
        (status = 200, description = "Menu item", body = ApiResponse<MenuItem>),
        (status = 404, description = "Not found")
    ),
    tag = "Menu"
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::get_menu_item(&state, &id).await?;
    Ok(Json(resp))
}
