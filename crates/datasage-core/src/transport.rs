//! Request transport for the analysis service.
//!
//! The state machines only see the [`Transport`] trait; [`HttpTransport`] is
//! the reqwest-backed implementation used by the CLI.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::ClientError;

/// Every service endpoint is a POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// A single file part.
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
}

impl RequestBody {
    /// A CSV file in the `file` form field, the shape every upload endpoint expects.
    pub fn csv(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        RequestBody::Multipart {
            field: "file".into(),
            file_name: file_name.into(),
            bytes,
            mime: "text/csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Path relative to the service base URL.
    pub endpoint: String,
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth_token: Option<String>,
}

impl TransportRequest {
    pub fn post(endpoint: impl Into<String>, body: RequestBody) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::Post,
            query: Vec::new(),
            body,
            auth_token: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }
}

/// A failed service call. `status` is `None` when no HTTP response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Sends one request to the analysis service and returns the decoded JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError>;
}

/// reqwest-backed transport rooted at the configured base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        Url::parse(&config.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid base URL {}: {}", config.base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve an endpoint against the base URL, keeping any base path prefix.
    fn url_for(&self, endpoint: &str) -> Result<Url, TransportError> {
        let joined = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| TransportError::network(format!("Invalid URL {}: {}", joined, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let url = self.url_for(&request.endpoint)?;
        debug!("{:?} {}", request.method, url);

        let mut builder = match request.method {
            Method::Post => self.client.post(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.auth_token {
            builder = builder.bearer_auth(token);
        }
        if let RequestBody::Multipart {
            field,
            file_name,
            bytes,
            mime,
        } = request.body
        {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(&mime)
                .map_err(|e| TransportError::network(format!("Invalid mime type: {}", e)))?;
            builder = builder.multipart(reqwest::multipart::Form::new().part(field, part));
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::network(format!("Network error: {}", e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportError::new(Some(status.as_u16()), format!("Read error: {}", e)))?;

        if !status.is_success() {
            let message = error_detail(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            warn!("Service returned {}: {}", status, message);
            return Err(TransportError::new(Some(status.as_u16()), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| TransportError::new(Some(status.as_u16()), format!("Parse error: {}", e)))
    }
}

/// Pull a human-readable message out of an error body (`{"detail": ...}`).
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        let config = ApiConfig {
            base_url: base.into(),
            ..ApiConfig::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let t = transport("https://analysis.example.com/api/");
        let url = t.url_for("/csv-chat/chat/").unwrap();
        assert_eq!(url.as_str(), "https://analysis.example.com/api/csv-chat/chat/");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(HttpTransport::new(&config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(
            error_detail(r#"{"detail":"Internal Server Error"}"#).as_deref(),
            Some("Internal Server Error")
        );
        assert!(error_detail("<html>bad gateway</html>").is_none());
        assert!(error_detail(r#"{"message":"x"}"#).is_none());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::new(Some(401), "Unauthorized").to_string(), "HTTP 401: Unauthorized");
        assert_eq!(TransportError::network("timed out").to_string(), "timed out");
    }

    #[test]
    fn test_request_builders() {
        let req = TransportRequest::post("/csv-chat/chat/", RequestBody::Empty)
            .with_query("question", "how many rows?")
            .with_token(Some("tok".into()));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.query, vec![("question".to_string(), "how many rows?".to_string())]);
        assert_eq!(req.auth_token.as_deref(), Some("tok"));
    }
}
