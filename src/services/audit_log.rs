use crate::services::masking::{mask_map, mask_sensitive};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Error,
}

impl AuditLevel {
    fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Error => "ERROR",
        }
    }
}

/// Append-only, masked trace of provider traffic: one file per provider per UTC day.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    base_dir: PathBuf,
    provider: String,
}

impl AuditLogger {
    pub fn new(base_dir: impl Into<PathBuf>, provider: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            provider: provider.into(),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join(&self.provider)
    }

    pub fn log_path_for(&self, day: NaiveDate) -> PathBuf {
        self.log_dir().join(format!("{}.log", day.format("%Y-%m-%d")))
    }

    pub fn current_log_path(&self) -> PathBuf {
        self.log_path_for(Utc::now().date_naive())
    }

    /// Records one HTTP boundary crossing. The body is decoded according to
    /// `content_type` and masked; unknown content types are logged as `{}`.
    pub async fn log_to_file(
        &self,
        transaction_id: &str,
        action: &str,
        url: &str,
        raw_body: &str,
        content_type: &str,
        extra: Option<&Value>,
    ) {
        let body = parse_body(raw_body, content_type);
        info!(transaction_id, action, url, provider = %self.provider, "audit");
        self.write_entry(AuditLevel::Info, transaction_id, action, Some(url), Some(&body), extra)
            .await;
    }

    pub async fn log_event(&self, transaction_id: &str, action: &str, extra: Option<&Value>) {
        info!(transaction_id, action, provider = %self.provider, "audit");
        self.write_entry(AuditLevel::Info, transaction_id, action, None, None, extra)
            .await;
    }

    pub async fn log_error(
        &self,
        transaction_id: &str,
        action: &str,
        message: &str,
        extra: Option<&Value>,
    ) {
        error!(transaction_id, action, provider = %self.provider, "{}", message);
        let mut details = Map::new();
        details.insert("message".to_string(), Value::String(message.to_string()));
        if let Some(extra) = extra {
            details.insert("context".to_string(), extra.clone());
        }
        let details = Value::Object(details);
        self.write_entry(AuditLevel::Error, transaction_id, action, None, None, Some(&details))
            .await;
    }

    async fn write_entry(
        &self,
        level: AuditLevel,
        transaction_id: &str,
        action: &str,
        url: Option<&str>,
        body: Option<&Value>,
        extra: Option<&Value>,
    ) {
        let block = render_block(level, transaction_id, action, url, body, extra);
        let path = self.current_log_path();
        if let Err(e) = append(&path, block.as_bytes()).await {
            error!(
                transaction_id,
                action,
                path = %path.display(),
                "Failed to write audit log: {}",
                e
            );
        }
    }
}

async fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    // One write per block keeps concurrent entries from interleaving.
    file.write_all(bytes).await?;
    file.flush().await
}

fn render_block(
    level: AuditLevel,
    transaction_id: &str,
    action: &str,
    url: Option<&str>,
    body: Option<&Value>,
    extra: Option<&Value>,
) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut block = format!("[{timestamp}] {} {transaction_id} {action}\n", level.as_str());
    if let Some(url) = url {
        block.push_str(&format!("URL: {url}\n"));
    }
    if let Some(body) = body {
        block.push_str(&format!("Body: {}\n", pretty(body)));
    }
    if let Some(extra) = extra {
        block.push_str(&format!("Extra: {}\n", pretty(&mask_sensitive(extra))));
    }
    block.push('\n');
    block
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Decodes and masks a raw body. Anything that is not JSON or form data is dropped.
pub fn parse_body(raw: &str, content_type: &str) -> Value {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains(JSON_CONTENT_TYPE) {
        return match serde_json::from_str::<Value>(raw) {
            Ok(value) => mask_sensitive(&value),
            Err(_) => Value::Object(Map::new()),
        };
    }
    if content_type.contains(FORM_CONTENT_TYPE) {
        let map: Map<String, Value> = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Value::Object(mask_map(&map));
    }
    Value::Object(Map::new())
}
