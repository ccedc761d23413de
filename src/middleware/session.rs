use axum::extract::FromRequestParts;
use uuid::Uuid;

use crate::{error::AppError, models::OrderSession, state::AppState};

pub const SESSION_HEADER: &str = "x-session-id";

/// The order session owning the cart, resolved from the `X-Session-Id` header.
#[derive(Debug, Clone)]
pub struct SessionContext(pub OrderSession);

impl SessionContext {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn table_number(&self) -> Option<&str> {
        self.0.table_number.as_deref()
    }
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .ok_or_else(|| AppError::BadRequest("Missing X-Session-Id header".into()))?
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid X-Session-Id header".into()))?;

        let session_id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::BadRequest("Invalid X-Session-Id header".into()))?;

        let session = sqlx::query_as::<_, OrderSession>(
            "SELECT id, table_number, created_at FROM order_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

        Ok(SessionContext(session))
    }
}
