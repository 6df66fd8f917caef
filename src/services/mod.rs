pub mod audit_log;
pub mod gateway_launcher;
pub mod http_client;
pub mod masking;

pub use audit_log::AuditLogger;
pub use gateway_launcher::GatewayLauncher;
pub use http_client::{HttpTransport, MtlsTransport};
