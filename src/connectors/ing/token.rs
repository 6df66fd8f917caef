use crate::error::GatewayError;
use crate::models::AccessToken;
use crate::services::audit_log::{AuditLogger, FORM_CONTENT_TYPE};
use crate::services::http_client::{ClientIdentity, HttpRequest, HttpTransport, RequestBody};
use serde_json::json;
use tracing::info;

const TOKEN_PATH: &str = "/oauth2/token";
const TOKEN_FAILED: &str = "Token request failed";

pub struct TokenAcquirer<'a> {
    transport: &'a dyn HttpTransport,
    audit: &'a AuditLogger,
}

impl<'a> TokenAcquirer<'a> {
    pub fn new(transport: &'a dyn HttpTransport, audit: &'a AuditLogger) -> Self {
        Self { transport, audit }
    }

    /// Client-credentials exchange authenticated by the client certificate alone.
    pub async fn get_access_token(
        &self,
        host: &str,
        client_id: &str,
        identity: &ClientIdentity,
        transaction_id: &str,
    ) -> Result<AccessToken, GatewayError> {
        match self.request_token(host, client_id, identity, transaction_id).await {
            Ok(token) => {
                info!(
                    transaction_id,
                    token_type = token.token_type.as_deref().unwrap_or("unknown"),
                    expires_in = token.expires_in,
                    "Access token obtained"
                );
                Ok(token)
            }
            Err(e) => {
                let e = e.wrap(TOKEN_FAILED);
                self.audit
                    .log_error(
                        transaction_id,
                        "TOKEN_ERROR",
                        e.message(),
                        Some(&json!({ "client_id": client_id, "chain": e.chain() })),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn request_token(
        &self,
        host: &str,
        client_id: &str,
        identity: &ClientIdentity,
        transaction_id: &str,
    ) -> Result<AccessToken, GatewayError> {
        let url = format!("{}{TOKEN_PATH}", host.trim_end_matches('/'));
        let body = RequestBody::Form(vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("client_id".to_string(), client_id.to_string()),
        ]);

        self.audit
            .log_to_file(transaction_id, "TOKEN_REQUEST", &url, &body.encode(), FORM_CONTENT_TYPE, None)
            .await;

        let response = self
            .transport
            .send(HttpRequest {
                url: url.clone(),
                headers: vec![("Accept".to_string(), "application/json".to_string())],
                body,
                identity: identity.clone(),
            })
            .await
            .map_err(|e| GatewayError::transport(e.to_string()).with_source(e))?;

        self.audit
            .log_to_file(
                transaction_id,
                "TOKEN_RESPONSE",
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

        let raw: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
            GatewayError::transport(format!("invalid token response: {e}")).with_source(e)
        })?;

        let token = raw
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| match raw.get("error").and_then(|v| v.as_str()) {
                Some(provider_error) => GatewayError::authentication(format!(
                    "no access token in response (error: {provider_error})"
                )),
                None => GatewayError::authentication("no access token in response"),
            })?;

        Ok(AccessToken {
            access_token: token.to_string(),
            token_type: raw.get("token_type").and_then(|v| v.as_str()).map(str::to_string),
            expires_in: raw.get("expires_in").and_then(|v| v.as_u64()),
        })
    }
}
