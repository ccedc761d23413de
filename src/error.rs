use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    models::ParseEnumError,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Customer name is required")]
    MissingCustomerName,

    #[error("Invalid discount {0}")]
    InvalidDiscount(String),

    #[error("Insufficient inventory for {item}: requested {requested}, available {available}")]
    InsufficientInventory {
        item: String,
        requested: i32,
        available: i32,
    },

    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("Persistence failure")]
    Persistence(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

/// A stored enum column held an unknown value.
impl From<ParseEnumError> for AppError {
    fn from(err: ParseEnumError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::EmptyCart
            | AppError::MissingCustomerName
            | AppError::InvalidDiscount(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InsufficientInventory { .. } | AppError::InvalidStatusTransition { .. } => {
                StatusCode::CONFLICT
            }
            AppError::DbError(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
            warnings: Vec::new(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_shortfall_is_a_conflict_naming_the_item() {
        let err = AppError::InsufficientInventory {
            item: "Latte".into(),
            requested: 3,
            available: 1,
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("Latte"));
    }

    #[test]
    fn commit_preconditions_are_bad_requests() {
        assert_eq!(AppError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingCustomerName.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InvalidDiscount("negative".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
