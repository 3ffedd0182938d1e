use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::OrderStatus,
    response::ApiResponse,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product is not available: {product}")]
    ProductUnavailable { product: String },

    #[error("Insufficient stock for '{product}'. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("Resource does not belong to the current user")]
    NotOwner,

    #[error("Order cannot be cancelled in status {status}")]
    OrderNotCancellable { status: OrderStatus },

    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Stock for product {product_id} was modified concurrently, please retry")]
    ConcurrentModification { product_id: Uuid },

    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    code: &'static str,
    error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::EmptyCart | AppError::InvalidPaymentMethod(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Forbidden | AppError::NotOwner => StatusCode::FORBIDDEN,
            AppError::ProductUnavailable { .. }
            | AppError::InsufficientStock { .. }
            | AppError::OrderNotCancellable { .. }
            | AppError::InvalidTransition { .. }
            | AppError::ConcurrentModification { .. } => StatusCode::CONFLICT,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind, sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Forbidden => "FORBIDDEN",
            AppError::EmptyCart => "EMPTY_CART",
            AppError::ProductUnavailable { .. } => "PRODUCT_UNAVAILABLE",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::NotOwner => "NOT_OWNER",
            AppError::OrderNotCancellable { .. } => "ORDER_NOT_CANCELLABLE",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            AppError::InvalidPaymentMethod(_) => "INVALID_PAYMENT_METHOD",
            AppError::OrmError(_) | AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse::failure(
            message.clone(),
            ErrorData {
                code: self.code(),
                error: message,
            },
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
