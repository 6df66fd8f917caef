use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Certificate and private key (PEM files) presented during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl ClientIdentity {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Form(Vec<(String, String)>),
    Json(Value),
}

impl RequestBody {
    /// The body exactly as it goes on the wire.
    pub fn encode(&self) -> String {
        match self {
            RequestBody::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish(),
            RequestBody::Json(value) => value.to_string(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
            RequestBody::Json(_) => "application/json",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub identity: ClientIdentity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid client certificate or key: {0}")]
    Certificate(#[source] reqwest::Error),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// Blocking-free POST seam between the connector and the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest transport that authenticates with the request's client certificate.
///
/// A client is built per request so no connection state outlives a transaction.
pub struct MtlsTransport {
    timeout: Duration,
    root_certificate: Option<PathBuf>,
}

impl MtlsTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            root_certificate: None,
        }
    }

    /// Trusts an extra CA (PEM) on top of the bundled web roots, for sandbox
    /// or privately issued provider certificates.
    pub fn with_root_certificate(mut self, ca_path: impl Into<PathBuf>) -> Self {
        self.root_certificate = Some(ca_path.into());
        self
    }

    async fn load_identity(identity: &ClientIdentity) -> Result<Identity, TransportError> {
        let cert = read_pem(&identity.cert_path).await?;
        let key = read_pem(&identity.key_path).await?;
        let mut chain = key;
        if !chain.ends_with(b"\n") {
            chain.push(b'\n');
        }
        chain.extend_from_slice(&cert);
        Identity::from_pem(&chain).map_err(TransportError::Certificate)
    }

    async fn client_for(&self, identity: &ClientIdentity) -> Result<Client, TransportError> {
        let identity = Self::load_identity(identity).await?;
        let mut builder = Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(self.timeout);
        if let Some(ca_path) = &self.root_certificate {
            let pem = read_pem(ca_path).await?;
            let ca = Certificate::from_pem(&pem).map_err(TransportError::Certificate)?;
            builder = builder.add_root_certificate(ca);
        }
        builder.build().map_err(TransportError::Certificate)
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, TransportError> {
    tokio::fs::read(path).await.map_err(|source| TransportError::Io {
        context: format!("unable to read certificate material {}", path.display()),
        source,
    })
}

#[async_trait]
impl HttpTransport for MtlsTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(&request.identity).await?;

        let mut builder = client
            .post(&request.url)
            .header("Content-Type", request.body.content_type())
            .body(request.body.encode());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        debug!(url = %request.url, status, "provider responded");
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
