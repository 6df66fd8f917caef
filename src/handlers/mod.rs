pub mod payments;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/payments", post(payments::create_payment))
        .with_state(state)
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}
