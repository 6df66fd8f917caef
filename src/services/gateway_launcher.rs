use crate::connectors::ing::{ConnectorConfig, IngConnector, IngSettings};
use crate::connectors::PaymentConnector;
use crate::error::GatewayError;
use crate::models::{PaymentMethod, PaymentRequest, PaymentResponse};
use crate::services::audit_log::AuditLogger;
use crate::services::http_client::HttpTransport;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MAX_ATTEMPTS: u32 = 2;

pub type ConnectorBox = Box<dyn PaymentConnector>;
pub type ConnectorFactory =
    Box<dyn Fn(&PaymentRequest) -> Result<ConnectorBox, GatewayError> + Send + Sync>;

/// Picks a connector by payment method and runs it with a single retry.
pub struct GatewayLauncher {
    factories: HashMap<PaymentMethod, ConnectorFactory>,
}

impl GatewayLauncher {
    /// Launcher with ING Open Banking registered.
    pub fn new(
        settings: IngSettings,
        audit: Arc<AuditLogger>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let mut launcher = Self::empty();
        launcher.register(
            PaymentMethod::IngOpenBanking,
            Box::new(move |request: &PaymentRequest| {
                let config = ConnectorConfig::new(&settings, request)?;
                Ok(Box::new(IngConnector::new(config, transport.clone(), audit.clone()))
                    as ConnectorBox)
            }),
        );
        launcher
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, method: PaymentMethod, factory: ConnectorFactory) {
        self.factories.insert(method, factory);
    }

    pub fn supports(&self, method: PaymentMethod) -> bool {
        self.factories.contains_key(&method)
    }

    pub fn connector_for(&self, request: &PaymentRequest) -> Result<ConnectorBox, GatewayError> {
        let method: PaymentMethod = request.payment_method.parse()?;
        let factory = self
            .factories
            .get(&method)
            .ok_or_else(|| GatewayError::unsupported_method(&request.payment_method))?;
        factory(request)
    }

    pub async fn process_transaction(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, GatewayError> {
        let connector = self.connector_for(request)?;
        Self::run_with_retry(connector.as_ref()).await
    }

    pub async fn run_with_retry(
        connector: &dyn PaymentConnector,
    ) -> Result<PaymentResponse, GatewayError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match connector.make_payment().await {
                Ok(response) => {
                    info!(
                        connector = connector.name(),
                        transaction_id = connector.transaction_id(),
                        attempts,
                        "Bank transaction succeeded"
                    );
                    return Ok(response);
                }
                Err(e) if attempts < MAX_ATTEMPTS => {
                    warn!(
                        connector = connector.name(),
                        transaction_id = connector.transaction_id(),
                        attempts,
                        "Payment attempt failed, retrying: {}",
                        e
                    );
                }
                Err(e) => {
                    error!(
                        connector = connector.name(),
                        transaction_id = connector.transaction_id(),
                        attempts,
                        "Bank transaction failed: {}",
                        e
                    );
                    return Err(e.wrap("Bank transaction failed"));
                }
            }
        }
    }
}
