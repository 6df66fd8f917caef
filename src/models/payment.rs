use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

fn default_status() -> String {
    "processing".to_string()
}

/// Caller-supplied payment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub currency: String,
    pub amount: f64,
    pub payment_method: String,
    pub return_url: String,
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    IngOpenBanking,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::IngOpenBanking => "ing_open_banking",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ing_open_banking" => Ok(PaymentMethod::IngOpenBanking),
            other => Err(GatewayError::unsupported_method(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: f64,
    pub currency: String,
}

/// Outbound body for `POST /payment-requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub fixed_amount: Amount,
    pub valid_until: String,
    pub maximum_allowed_payments: u32,
    pub maximum_receivable_amount: Amount,
    pub purchase_id: String,
    pub description: String,
    pub return_url: String,
}

/// Normalized provider result. Only built through [`PaymentResponse::from_raw`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    transaction_id: String,
    payment_url: String,
    #[serde(skip)]
    raw_response: Map<String, Value>,
}

impl PaymentResponse {
    /// Returns `None` unless `id` and `paymentInitiationUrl` are non-empty strings.
    pub fn from_raw(raw: Map<String, Value>) -> Option<Self> {
        let id = non_empty_str(&raw, "id")?.to_string();
        let url = non_empty_str(&raw, "paymentInitiationUrl")?.to_string();
        Some(Self {
            transaction_id: id,
            payment_url: url,
            raw_response: raw,
        })
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn payment_url(&self) -> &str {
        &self.payment_url
    }

    pub fn raw_response(&self) -> &Map<String, Value> {
        &self.raw_response
    }
}

fn non_empty_str<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
