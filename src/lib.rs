pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ports;
pub mod services;
pub mod shwary;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ports::TransactionRepository;
use crate::services::PaymentService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PaymentService>,
    pub repository: Arc<dyn TransactionRepository>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhook", post(handlers::webhook::webhook))
        .route("/transactions/:id", get(handlers::webhook::get_transaction))
        .with_state(state)
}
