use crate::connectors::ing::IngSettings;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Return internal error messages to HTTP clients.
    pub expose_error_details: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9999,
            expose_error_details: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub audit_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            audit_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngConfig {
    #[serde(flatten)]
    pub settings: IngSettings,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra CA trusted for the ING endpoints, e.g. a sandbox issuer.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl IngConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for IngConfig {
    fn default() -> Self {
        Self {
            settings: IngSettings {
                host: "https://api.sandbox.ing.com".to_string(),
                client_id: String::new(),
                merchant_id: String::new(),
                cert_path: PathBuf::from("certs/tls.crt"),
                key_path: PathBuf::from("certs/tls.key"),
            },
            request_timeout_secs: default_timeout_secs(),
            ca_cert_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ing: IngConfig,
}

impl Config {
    /// Reads the optional TOML file, then applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::load_with(path, &vars)
    }

    pub fn load_with(path: Option<&Path>, vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        if let Some(port) = get("PORT") {
            self.server.port = port.parse().with_context(|| format!("PORT={port}"))?;
        }
        if let Some(expose) = get("EXPOSE_ERROR_DETAILS") {
            self.server.expose_error_details = expose
                .parse()
                .with_context(|| format!("EXPOSE_ERROR_DETAILS={expose}"))?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = get("AUDIT_LOG_DIR") {
            self.logging.audit_dir = PathBuf::from(dir);
        }

        let ing = &mut self.ing.settings;
        if let Some(host) = get("ING_HOST") {
            ing.host = host;
        }
        if let Some(client_id) = get("ING_CLIENT_ID") {
            ing.client_id = client_id;
        }
        if let Some(merchant_id) = get("ING_MERCHANT_ID") {
            ing.merchant_id = merchant_id;
        }
        if let Some(cert) = get("ING_CERT_PATH") {
            ing.cert_path = PathBuf::from(cert);
        }
        if let Some(key) = get("ING_KEY_PATH") {
            ing.key_path = PathBuf::from(key);
        }
        if let Some(ca) = get("ING_CA_CERT_PATH") {
            self.ing.ca_cert_path = Some(PathBuf::from(ca));
        }
        if let Some(timeout) = get("ING_REQUEST_TIMEOUT_SECS") {
            self.ing.request_timeout_secs = timeout
                .parse()
                .with_context(|| format!("ING_REQUEST_TIMEOUT_SECS={timeout}"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let ing = &self.ing.settings;
        if ing.client_id.trim().is_empty() {
            bail!("ing.client_id is required (or set ING_CLIENT_ID)");
        }
        url::Url::parse(&ing.host).with_context(|| format!("ing.host '{}' is not a URL", ing.host))?;
        if self.ing.request_timeout_secs == 0 {
            bail!("ing.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
