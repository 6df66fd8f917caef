use crate::error::GatewayError;
use crate::models::PaymentResponse;
use crate::services::audit_log::AuditLogger;
use serde_json::{json, Map, Value};

pub const INVALID_RESPONSE: &str = "Invalid payment response from ING";

pub struct ResponseProcessor<'a> {
    audit: &'a AuditLogger,
}

impl<'a> ResponseProcessor<'a> {
    pub fn new(audit: &'a AuditLogger) -> Self {
        Self { audit }
    }

    pub async fn process_payment_response(
        &self,
        raw: Map<String, Value>,
        transaction_id: &str,
    ) -> Result<PaymentResponse, GatewayError> {
        let keys: Vec<&String> = raw.keys().collect();
        let received = json!({ "received_keys": keys });

        match PaymentResponse::from_raw(raw) {
            Some(response) => {
                self.audit
                    .log_event(
                        transaction_id,
                        "PAYMENT_SUCCESS",
                        Some(&json!({
                            "transaction_id": transaction_id,
                            "payment_id": response.transaction_id(),
                            "payment_initiation_url": response.payment_url(),
                        })),
                    )
                    .await;
                Ok(response)
            }
            None => {
                self.audit
                    .log_error(
                        transaction_id,
                        "PAYMENT_RESPONSE_INVALID",
                        "Invalid payment response structure",
                        Some(&received),
                    )
                    .await;
                Err(GatewayError::response_shape(INVALID_RESPONSE))
            }
        }
    }
}
