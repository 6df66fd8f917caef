use crate::app::Config;
use crate::connectors::ing::PROVIDER;
use crate::services::audit_log::AuditLogger;
use crate::services::gateway_launcher::GatewayLauncher;
use crate::services::http_client::{HttpTransport, MtlsTransport};
use std::sync::Arc;

pub struct AppState {
    pub launcher: GatewayLauncher,
    pub expose_error_details: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let mut transport = MtlsTransport::new(config.ing.request_timeout());
        if let Some(ca) = &config.ing.ca_cert_path {
            transport = transport.with_root_certificate(ca);
        }
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let audit = Arc::new(AuditLogger::new(&config.logging.audit_dir, PROVIDER));
        Self {
            launcher: GatewayLauncher::new(config.ing.settings.clone(), audit, transport),
            expose_error_details: config.server.expose_error_details,
        }
    }
}
