use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::analytics::Dashboard,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Settings,
    response::ApiResponse,
    services::{analytics_service, settings_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/settings", get(get_settings))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Counts and today's revenue", body = ApiResponse<Dashboard>)
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let resp = analytics_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Cafe settings", body = ApiResponse<Settings>)
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Settings>>> {
    let resp = settings_service::get_settings(&state, &user).await?;
    Ok(Json(resp))
}
