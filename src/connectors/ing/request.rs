use crate::error::GatewayError;
use crate::models::{Amount, PaymentPayload};
use chrono::{Duration, Utc};
use url::Url;
use uuid::Uuid;

pub const INVALID_AMOUNT: &str = "Payment amount must be a positive number";
pub const INVALID_CURRENCY: &str = "Invalid currency code format";
pub const INVALID_RETURN_URL: &str = "Invalid return URL";
pub const RETURN_URL_NOT_HTTPS: &str = "Return URL must use HTTPS protocol";

const VALID_UNTIL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f+00:00";

/// Validates the inputs (first failure wins) and builds a single-use payment payload.
pub fn build_payment_request(
    amount: f64,
    currency: &str,
    description: &str,
    return_url: &str,
) -> Result<PaymentPayload, GatewayError> {
    validate(amount, currency, return_url)?;

    let amount = Amount {
        value: amount,
        currency: currency.to_string(),
    };
    let valid_until = (Utc::now() + Duration::days(1))
        .format(VALID_UNTIL_FORMAT)
        .to_string();

    Ok(PaymentPayload {
        fixed_amount: amount.clone(),
        valid_until,
        maximum_allowed_payments: 1,
        maximum_receivable_amount: amount,
        purchase_id: Uuid::new_v4().simple().to_string(),
        description: description.to_string(),
        return_url: return_url.to_string(),
    })
}

fn validate(amount: f64, currency: &str, return_url: &str) -> Result<(), GatewayError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(GatewayError::validation(INVALID_AMOUNT));
    }

    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(GatewayError::validation(INVALID_CURRENCY));
    }

    if return_url.is_empty() {
        return Err(GatewayError::validation(INVALID_RETURN_URL));
    }
    let parsed = Url::parse(return_url)
        .map_err(|e| GatewayError::validation(INVALID_RETURN_URL).with_source(e))?;
    if !parsed.has_host() {
        return Err(GatewayError::validation(INVALID_RETURN_URL));
    }
    // Url lowercases the scheme while parsing.
    if parsed.scheme() != "https" {
        return Err(GatewayError::validation(RETURN_URL_NOT_HTTPS));
    }

    Ok(())
}
