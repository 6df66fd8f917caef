use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::app::AppState;
use crate::models::PaymentRequest;

const GENERIC_ERROR: &str = "Payment processing failed";

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PaymentRequest>,
) -> (StatusCode, Json<Value>) {
    info!(
        payment_method = %request.payment_method,
        currency = %request.currency,
        "Received payment request"
    );

    match state.launcher.process_transaction(&request).await {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "transactionId": response.transaction_id(),
                "paymentUrl": response.payment_url(),
            })),
        ),
        Err(e) => {
            error!(kind = %e.kind(), "Payment request failed: {}", e);
            let message = if state.expose_error_details {
                e.to_string()
            } else {
                GENERIC_ERROR.to_string()
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": message })),
            )
        }
    }
}
