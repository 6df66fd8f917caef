pub mod ing;

use crate::error::GatewayError;
use crate::models::PaymentResponse;
use async_trait::async_trait;

/// Capability every payment method provides: submit one payment, return a normalized response.
#[async_trait]
pub trait PaymentConnector: Send + Sync {
    fn name(&self) -> &'static str;

    fn transaction_id(&self) -> &str;

    async fn make_payment(&self) -> Result<PaymentResponse, GatewayError>;
}

pub use ing::IngConnector;
