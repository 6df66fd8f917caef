use crate::error::GatewayError;
use crate::models::{AccessToken, PaymentPayload};
use crate::services::audit_log::{AuditLogger, JSON_CONTENT_TYPE};
use crate::services::http_client::{ClientIdentity, HttpRequest, HttpTransport, RequestBody};
use serde_json::{json, Map, Value};

const PAYMENT_PATH: &str = "/payment-requests";

pub struct PaymentSender<'a> {
    transport: &'a dyn HttpTransport,
    audit: &'a AuditLogger,
}

impl<'a> PaymentSender<'a> {
    pub fn new(transport: &'a dyn HttpTransport, audit: &'a AuditLogger) -> Self {
        Self { transport, audit }
    }

    /// Posts the payload and hands back the decoded body without checking its shape.
    pub async fn send_payment_request(
        &self,
        payload: &PaymentPayload,
        host: &str,
        access_token: &AccessToken,
        identity: &ClientIdentity,
        transaction_id: &str,
    ) -> Result<Map<String, Value>, GatewayError> {
        let url = format!("{}{PAYMENT_PATH}", host.trim_end_matches('/'));
        let body = serde_json::to_value(payload).map_err(|e| {
            GatewayError::transport(format!("unable to encode payment payload: {e}")).with_source(e)
        })?;
        let headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), access_token.bearer()),
        ];

        let logged_headers: Map<String, Value> = headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .chain(std::iter::once((
                "Content-Type".to_string(),
                Value::String(JSON_CONTENT_TYPE.to_string()),
            )))
            .collect();
        self.audit
            .log_to_file(
                transaction_id,
                "PAYMENT_REQUEST",
                &url,
                &body.to_string(),
                JSON_CONTENT_TYPE,
                Some(&json!({ "headers": logged_headers })),
            )
            .await;

        let response = self
            .transport
            .send(HttpRequest {
                url: url.clone(),
                headers,
                body: RequestBody::Json(body),
                identity: identity.clone(),
            })
            .await
            .map_err(|e| GatewayError::transport(e.to_string()).with_source(e))?;

        self.audit
            .log_to_file(
                transaction_id,
                "PAYMENT_RESPONSE",
                &url,
                &response.body,
                &response.content_type,
                Some(&json!({ "status": response.status })),
            )
            .await;

        if !response.is_success() {
            return Err(GatewayError::transport(format!(
                "HTTP {} from {url}",
                response.status
            )));
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(GatewayError::transport("payment response is not a JSON object")),
            Err(e) => Err(GatewayError::transport(format!("invalid payment response body: {e}"))
                .with_source(e)),
        }
    }
}
