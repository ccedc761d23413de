use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod menu;
pub mod orders;
pub mod params;
pub mod tables;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/menu", menu::router())
        .nest("/sessions", cart::session_router())
        .nest("/cart", cart::router())
        .route("/checkout", post(orders::checkout))
        .nest("/orders", orders::router())
        .nest("/tables", tables::router())
        .route("/qr", get(tables::menu_qr).put(tables::update_menu_qr))
        .merge(dashboard::router())
        .nest("/admin", admin::router())
}
