mod common;

use axum::{
    extract::{Form, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use common::*;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use ing_payment_gateway::app::{AppState, Config};
use ing_payment_gateway::connectors::ing::{ConnectorConfig, IngConnector};
use ing_payment_gateway::connectors::PaymentConnector;
use ing_payment_gateway::handlers;
use ing_payment_gateway::services::audit_log::AuditLogger;
use ing_payment_gateway::services::http_client::MtlsTransport;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::rustls::server::AllowAnyAuthenticatedClient;
use tokio_rustls::rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

#[derive(Clone)]
struct FakeIng {
    issue_token: bool,
}

async fn token(
    State(fake): State<FakeIng>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let valid = form.get("grant_type").map(String::as_str) == Some("client_credentials")
        && form.get("client_id").map(String::as_str) == Some("client-5ca1ab1e");
    if !fake.issue_token || !valid {
        return (StatusCode::OK, Json(json!({"error": "invalid_client"})));
    }
    (
        StatusCode::OK,
        Json(json!({"access_token": "local-token-0001", "token_type": "Bearer", "expires_in": 900})),
    )
}

async fn payment_requests(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer local-token-0001");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    if body["maximumAllowedPayments"] != 1 || body["fixedAmount"]["currency"] != "EUR" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad payload"})));
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "ing-local-42",
            "paymentInitiationUrl": "https://pay.example/ing-local-42",
            "purchaseId": body["purchaseId"],
        })),
    )
}

fn pem_certs(name: &str) -> Vec<Certificate> {
    let file = File::open(fixtures_dir().join(name)).unwrap();
    rustls_pemfile::certs(&mut BufReader::new(file))
        .unwrap()
        .into_iter()
        .map(Certificate)
        .collect()
}

/// Server side of the handshake: presents `server.crt` and only accepts
/// clients whose certificate chains to the fixture CA.
fn provider_tls_config() -> ServerConfig {
    let mut roots = RootCertStore::empty();
    for ca in pem_certs("ca.crt") {
        roots.add(&ca).unwrap();
    }

    let key_file = File::open(fixtures_dir().join("server.key")).unwrap();
    let key = rustls_pemfile::pkcs8_private_keys(&mut BufReader::new(key_file))
        .unwrap()
        .remove(0);

    ServerConfig::builder()
        .with_safe_defaults()
        .with_client_cert_verifier(AllowAnyAuthenticatedClient::new(roots).boxed())
        .with_single_cert(pem_certs("server.crt"), PrivateKey(key))
        .unwrap()
}

/// Serves the fake provider over mutual TLS and returns its `https://` base URL.
async fn spawn_fake_ing(issue_token: bool) -> String {
    let app: Router = Router::new()
        .route("/oauth2/token", post(token))
        .route("/payment-requests", post(payment_requests))
        .with_state(FakeIng { issue_token });

    let acceptor = TlsAcceptor::from(Arc::new(provider_tls_config()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let app = app.clone();
            tokio::spawn(async move {
                // Handshakes without an acceptable client certificate end here.
                let Ok(tls) = acceptor.accept(stream).await else {
                    return;
                };
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(tls), TowerToHyperService::new(app))
                    .await;
            });
        }
    });
    format!("https://{addr}")
}

/// The gateway itself is plain HTTP.
async fn spawn_gateway(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn trusting_transport() -> MtlsTransport {
    MtlsTransport::new(Duration::from_secs(5)).with_root_certificate(fixtures_dir().join("ca.crt"))
}

fn connector(host: String, transport: MtlsTransport, audit: Arc<AuditLogger>) -> IngConnector {
    let mut settings = settings(&fixtures_dir());
    settings.host = host;
    let config = ConnectorConfig::new(&settings, &payment_request()).unwrap();
    IngConnector::new(config, Arc::new(transport), audit)
}

#[tokio::test]
async fn mtls_transport_completes_payment_against_provider() {
    let host = spawn_fake_ing(true).await;
    let logs = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLogger::new(logs.path(), "ing"));

    let response = connector(host, trusting_transport(), audit.clone())
        .make_payment()
        .await
        .unwrap();

    assert_eq!(response.transaction_id(), "ing-local-42");
    assert_eq!(response.payment_url(), "https://pay.example/ing-local-42");
    assert!(response.raw_response()["purchaseId"].is_string());

    let log = std::fs::read_to_string(audit.current_log_path()).unwrap();
    assert!(!log.contains(" ERROR "));
    assert!(!log.contains("local-token-0001"));
}

#[tokio::test]
async fn provider_refuses_clients_without_a_certificate() {
    let host = spawn_fake_ing(true).await;
    let ca = std::fs::read(fixtures_dir().join("ca.crt")).unwrap();
    let anonymous = reqwest::Client::builder()
        .use_rustls_tls()
        .add_root_certificate(reqwest::Certificate::from_pem(&ca).unwrap())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let result = anonymous
        .post(format!("{host}/oauth2/token"))
        .form(&[("grant_type", "client_credentials"), ("client_id", "client-5ca1ab1e")])
        .send()
        .await;

    assert!(result.is_err(), "handshake without a client certificate succeeded");
}

#[tokio::test]
async fn untrusted_provider_certificate_is_a_token_failure() {
    let host = spawn_fake_ing(true).await;
    let logs = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLogger::new(logs.path(), "ing"));
    let transport = MtlsTransport::new(Duration::from_secs(5));

    let err = connector(host, transport, audit).make_payment().await.unwrap_err();

    assert!(err.to_string().starts_with("Token request failed:"), "{err}");
}

#[tokio::test]
async fn mtls_transport_reports_token_rejection() {
    let host = spawn_fake_ing(false).await;
    let logs = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLogger::new(logs.path(), "ing"));

    let err = connector(host, trusting_transport(), audit)
        .make_payment()
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Token request failed:"), "{err}");
    assert!(err.to_string().contains("invalid_client"));
}

#[tokio::test]
async fn unreadable_certificate_is_a_token_failure() {
    let host = spawn_fake_ing(true).await;
    let logs = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLogger::new(logs.path(), "ing"));
    let mut settings = settings(logs.path());
    settings.host = host;
    let config = ConnectorConfig::new(&settings, &payment_request()).unwrap();
    let connector = IngConnector::new(config, Arc::new(trusting_transport()), audit);

    let err = connector.make_payment().await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Token request failed:"), "{message}");
    assert!(message.contains("client.crt"));
}

fn app_config(host: String, audit_dir: &std::path::Path, expose: bool) -> Config {
    let mut config = Config::default();
    config.ing.settings = settings(&fixtures_dir());
    config.ing.settings.host = host;
    config.ing.request_timeout_secs = 5;
    config.ing.ca_cert_path = Some(fixtures_dir().join("ca.crt"));
    config.logging.audit_dir = audit_dir.to_path_buf();
    config.server.expose_error_details = expose;
    config
}

async fn post_payment(gateway: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{gateway}/payments"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn payment_body() -> Value {
    serde_json::to_value(payment_request()).unwrap()
}

#[tokio::test]
async fn payments_endpoint_returns_payment_url() {
    let host = spawn_fake_ing(true).await;
    let logs = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::from_config(&app_config(host, logs.path(), true)));
    let gateway = spawn_gateway(handlers::router(state)).await;

    let (status, body) = post_payment(&gateway, payment_body()).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["transactionId"], "ing-local-42");
    assert_eq!(body["paymentUrl"], "https://pay.example/ing-local-42");
}

#[tokio::test]
async fn payments_endpoint_surfaces_gateway_errors() {
    let host = spawn_fake_ing(false).await;
    let logs = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::from_config(&app_config(host, logs.path(), true)));
    let gateway = spawn_gateway(handlers::router(state)).await;

    let (status, body) = post_payment(&gateway, payment_body()).await;

    assert_eq!(status, 500);
    assert_eq!(body["status"], "error");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Bank transaction failed: Token request failed:"), "{message}");
}

#[tokio::test]
async fn payments_endpoint_can_hide_error_details() {
    let host = spawn_fake_ing(true).await;
    let logs = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::from_config(&app_config(host, logs.path(), false)));
    let gateway = spawn_gateway(handlers::router(state)).await;

    let mut body = payment_body();
    body["paymentMethod"] = json!("credit_card");
    let (status, body) = post_payment(&gateway, body).await;

    assert_eq!(status, 500);
    assert_eq!(body, json!({"status": "error", "message": "Payment processing failed"}));
}
