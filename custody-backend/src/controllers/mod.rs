//! HTTP handlers
//!
//! Errors use the body `{"success": false, "error": "..."}` with the status
//! code of the [`WalletError`] kind.

pub mod health;
pub mod jobs;
pub mod transactions;

use std::sync::Arc;

use actix_web::{http::StatusCode, web, HttpResponse};
use custody_types::ApiError;

use crate::error::WalletError;
use crate::transactions::TransactionService;
use crate::AppState;

pub fn error_response(err: &WalletError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() && !matches!(err, WalletError::Capacity) {
        log::error!("[HTTP] {}", err);
    }
    HttpResponse::build(status).json(ApiError::new(err.to_string()))
}

/// The transaction service, or a 503 when this process runs without one.
fn transaction_service(state: &web::Data<AppState>) -> Result<Arc<TransactionService>, HttpResponse> {
    state.transactions.clone().ok_or_else(|| {
        HttpResponse::ServiceUnavailable().json(ApiError::new("transaction submission is not configured"))
    })
}
