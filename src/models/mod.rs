pub mod payment;
pub mod token;

pub use payment::{Amount, PaymentMethod, PaymentPayload, PaymentRequest, PaymentResponse};
pub use token::AccessToken;
