//! ING Open Banking connector.
//!
//! One [`IngConnector`] per transaction: token over mutual TLS, payload
//! validation, submission to `/payment-requests` and response normalization.

pub mod request;
pub mod response;
pub mod sender;
pub mod token;

use crate::connectors::PaymentConnector;
use crate::error::{ErrorKind, GatewayError};
use crate::models::{AccessToken, PaymentRequest, PaymentResponse};
use crate::services::audit_log::AuditLogger;
use crate::services::http_client::{ClientIdentity, HttpTransport};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub use request::build_payment_request;
pub use response::ResponseProcessor;
pub use sender::PaymentSender;
pub use token::TokenAcquirer;

pub const PROVIDER: &str = "ing";

/// Process-wide ING credentials and endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngSettings {
    pub host: String,
    pub client_id: String,
    #[serde(default)]
    pub merchant_id: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Everything one transaction needs, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorConfig {
    pub host: String,
    pub client_id: String,
    pub merchant_id: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub amount: f64,
    pub currency: String,
    pub return_url: String,
    pub description: String,
}

impl ConnectorConfig {
    pub fn new(settings: &IngSettings, request: &PaymentRequest) -> Result<Self, GatewayError> {
        let host = Url::parse(&settings.host).map_err(|e| {
            GatewayError::configuration(format!("Invalid ING host '{}'", settings.host)).with_source(e)
        })?;
        if !host.has_host() {
            return Err(GatewayError::configuration(format!(
                "Invalid ING host '{}'",
                settings.host
            )));
        }
        if settings.client_id.trim().is_empty() {
            return Err(GatewayError::configuration("ING client id is not configured"));
        }
        if settings.cert_path.as_os_str().is_empty() || settings.key_path.as_os_str().is_empty() {
            return Err(GatewayError::configuration(
                "ING client certificate and key paths are required",
            ));
        }

        Ok(Self {
            host: settings.host.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            merchant_id: settings.merchant_id.clone(),
            cert_path: settings.cert_path.clone(),
            key_path: settings.key_path.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            return_url: request.return_url.clone(),
            description: request.description.clone(),
        })
    }

    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity::new(&self.cert_path, &self.key_path)
    }
}

pub fn generate_transaction_id() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{PROVIDER}_{}_{suffix:08x}", Utc::now().format("%Y%m%d%H%M%S"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Created,
    TokenPending,
    TokenAcquired,
    PaymentPending,
    Completed,
    Failed,
}

pub struct IngConnector {
    config: ConnectorConfig,
    transaction_id: String,
    transport: Arc<dyn HttpTransport>,
    audit: Arc<AuditLogger>,
    state: Mutex<ConnectorState>,
}

impl IngConnector {
    pub fn new(
        config: ConnectorConfig,
        transport: Arc<dyn HttpTransport>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            config,
            transaction_id: generate_transaction_id(),
            transport,
            audit,
            state: Mutex::new(ConnectorState::Created),
        }
    }

    pub fn state(&self) -> ConnectorState {
        *self.state.lock()
    }

    fn transition(&self, next: ConnectorState) {
        let mut state = self.state.lock();
        debug!(transaction_id = %self.transaction_id, from = ?*state, to = ?next, "connector state");
        *state = next;
    }

    /// Claims the connector for a new attempt. The state check and the move
    /// to `TokenPending` happen under one lock, so only one caller can start.
    fn begin_attempt(&self) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        match *state {
            ConnectorState::Created => {}
            ConnectorState::Failed => {
                warn!(transaction_id = %self.transaction_id, "Retrying payment from token acquisition");
            }
            ConnectorState::Completed => {
                return Err(GatewayError::invalid_state(format!(
                    "Payment already completed for transaction {}",
                    self.transaction_id
                )));
            }
            in_flight => {
                return Err(GatewayError::invalid_state(format!(
                    "Payment already in progress for transaction {} ({in_flight:?})",
                    self.transaction_id
                )));
            }
        }
        debug!(
            transaction_id = %self.transaction_id,
            from = ?*state,
            to = ?ConnectorState::TokenPending,
            "connector state"
        );
        *state = ConnectorState::TokenPending;
        Ok(())
    }

    fn fail(&self, err: GatewayError) -> GatewayError {
        self.transition(ConnectorState::Failed);
        err
    }

    async fn run(&self) -> Result<PaymentResponse, GatewayError> {
        let identity = self.config.identity();

        let token = TokenAcquirer::new(self.transport.as_ref(), &self.audit)
            .get_access_token(
                &self.config.host,
                &self.config.client_id,
                &identity,
                &self.transaction_id,
            )
            .await
            .map_err(|e| self.fail(e))?;

        self.transition(ConnectorState::TokenAcquired);
        if token.is_empty() {
            return Err(self.fail(GatewayError::authentication("Authentication required")));
        }

        self.transition(ConnectorState::PaymentPending);
        match self.submit(&token, &identity).await {
            Ok(response) => {
                self.transition(ConnectorState::Completed);
                info!(
                    transaction_id = %self.transaction_id,
                    payment_id = response.transaction_id(),
                    "Payment initiated"
                );
                Ok(response)
            }
            Err(e) => Err(self.fail(self.report_payment_error(e).await)),
        }
    }

    async fn submit(
        &self,
        token: &AccessToken,
        identity: &ClientIdentity,
    ) -> Result<PaymentResponse, GatewayError> {
        let payload = build_payment_request(
            self.config.amount,
            &self.config.currency,
            &self.config.description,
            &self.config.return_url,
        )?;

        let raw = PaymentSender::new(self.transport.as_ref(), &self.audit)
            .send_payment_request(&payload, &self.config.host, token, identity, &self.transaction_id)
            .await?;

        ResponseProcessor::new(&self.audit)
            .process_payment_response(raw, &self.transaction_id)
            .await
    }

    /// Logs a payment-stage failure once and adds stage context to foreign errors.
    async fn report_payment_error(&self, err: GatewayError) -> GatewayError {
        match err.kind() {
            ErrorKind::Validation => {
                self.audit
                    .log_error(&self.transaction_id, "VALIDATION_ERROR", err.message(), None)
                    .await;
                err
            }
            // Already logged by the response processor.
            ErrorKind::ResponseShape => err,
            ErrorKind::Authentication
            | ErrorKind::UnsupportedMethod
            | ErrorKind::Configuration
            | ErrorKind::InvalidState => {
                self.audit
                    .log_error(&self.transaction_id, "PAYMENT_ERROR", err.message(), None)
                    .await;
                err
            }
            ErrorKind::Transport => {
                self.audit
                    .log_error(
                        &self.transaction_id,
                        "PAYMENT_ERROR",
                        err.message(),
                        Some(&json!({ "chain": err.chain() })),
                    )
                    .await;
                err.wrap("Payment failed")
            }
        }
    }
}

#[async_trait]
impl PaymentConnector for IngConnector {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    async fn make_payment(&self) -> Result<PaymentResponse, GatewayError> {
        self.begin_attempt()?;

        self.audit
            .log_event(
                &self.transaction_id,
                "PAYMENT_START",
                Some(&json!({
                    "host": self.config.host,
                    "client_id": self.config.client_id,
                    "Merchant-Id": self.config.merchant_id,
                    "amount": self.config.amount,
                    "currency": self.config.currency,
                    "return_url": self.config.return_url,
                })),
            )
            .await;

        self.run().await
    }
}
