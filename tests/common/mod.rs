#![allow(dead_code)]

use async_trait::async_trait;
use ing_payment_gateway::connectors::ing::IngSettings;
use ing_payment_gateway::models::PaymentRequest;
use ing_payment_gateway::services::http_client::{
    HttpRequest, HttpResponse, HttpTransport, TransportError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;

pub const HOST: &str = "https://api.sandbox.ing.example";

pub enum Scripted {
    Respond(HttpResponse),
    Fail(std::io::ErrorKind, &'static str),
}

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push(request);
        // Hand control back like a real network round trip would.
        tokio::task::yield_now().await;
        match self.script.lock().pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(kind, message)) => Err(TransportError::Io {
                context: "connection to provider failed".to_string(),
                source: std::io::Error::new(kind, message),
            }),
            None => panic!("scripted transport ran out of responses"),
        }
    }
}

pub fn json_response(status: u16, body: Value) -> Scripted {
    Scripted::Respond(HttpResponse {
        status,
        content_type: "application/json".to_string(),
        body: body.to_string(),
    })
}

pub fn token_ok() -> Scripted {
    json_response(
        200,
        json!({"access_token": "eyJ-very-secret-bearer", "token_type": "Bearer", "expires_in": 905}),
    )
}

pub fn payment_ok(id: &str) -> Scripted {
    json_response(
        201,
        json!({
            "id": id,
            "paymentInitiationUrl": format!("https://pay.example/{id}"),
            "status": "OPEN"
        }),
    )
}

pub fn settings(cert_dir: &Path) -> IngSettings {
    IngSettings {
        host: HOST.to_string(),
        client_id: "client-5ca1ab1e".to_string(),
        merchant_id: "merchant-12345".to_string(),
        cert_path: cert_dir.join("client.crt"),
        key_path: cert_dir.join("client.key"),
    }
}

pub fn payment_request() -> PaymentRequest {
    PaymentRequest {
        currency: "EUR".to_string(),
        amount: 49.95,
        payment_method: "ing_open_banking".to_string(),
        return_url: "https://shop.example/checkout/return".to_string(),
        description: "Order #1001".to_string(),
        status: "processing".to_string(),
    }
}

pub fn fixtures_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}
