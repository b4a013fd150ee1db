pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::services::TransactionLifecycle;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<TransactionLifecycle>,
    pub frontend_url: String,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/payment", post(handlers::payment::create_payment))
        .route("/api/payment/:tran_id", get(handlers::payment::get_payment))
        .route("/payment/success", post(handlers::callback::payment_success))
        .route("/payment/fail", post(handlers::callback::payment_fail))
        .route("/payment/cancel", post(handlers::callback::payment_cancel))
        .route("/payment/ipn", post(handlers::callback::payment_ipn))
        .layer(axum::middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .with_state(state)
}
