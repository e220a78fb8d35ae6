//! Opaque inference RPC seam.
//!
//! The engine treats the inference service as a remote procedure: a prompt
//! goes in, either plain text or an object matching a supplied JSON schema
//! comes back. Nothing in the engine depends on which model or vendor sits
//! behind the endpoint.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// A single inference call.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRequest {
    pub prompt: String,
    pub add_context_from_internet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<Value>,
}

impl InferenceRequest {
    /// A free-text request with live-web context enabled.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            add_context_from_internet: true,
            response_json_schema: None,
        }
    }

    /// A request whose response must match `schema`.
    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            add_context_from_internet: true,
            response_json_schema: Some(schema),
        }
    }
}

/// What came back from the service.
#[derive(Debug, Clone)]
pub enum InferenceResponse {
    Text(String),
    Structured(Value),
}

impl InferenceResponse {
    /// Collapse to a raw JSON value. Text responses become JSON strings,
    /// which downstream shape checks then reject where an object was
    /// required.
    pub fn into_value(self) -> Value {
        match self {
            InferenceResponse::Text(s) => Value::String(s),
            InferenceResponse::Structured(v) => v,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("inference endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response payload: {0}")]
    Payload(String),
}

impl InferenceError {
    pub fn is_network(&self) -> bool {
        matches!(self, InferenceError::Network(_))
    }
}

/// The RPC seam. Implementations must be cheap to call concurrently.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError>;
}

/// HTTP implementation posting requests as JSON to a fixed endpoint.
///
/// The endpoint replies with a JSON document: a string for free-text
/// prompts, an object when a response schema was supplied.
pub struct HttpInferenceClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpInferenceClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("sitrep/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            endpoint,
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn invoke(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InferenceError::Status(resp.status()));
        }

        let body: Value = resp.json().await?;
        match body {
            Value::String(text) => Ok(InferenceResponse::Text(text)),
            v if v.is_object() => Ok(InferenceResponse::Structured(v)),
            other => Err(InferenceError::Payload(format!(
                "expected string or object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_absent_schema() {
        let req = InferenceRequest::text("what time is it");
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("response_json_schema").is_none());
        assert_eq!(value["add_context_from_internet"], true);
    }

    #[tokio::test]
    async fn text_response_decodes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/invoke")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("\"2026-01-01T00:00:00Z\"")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/invoke", server.url())).unwrap();
        let client = HttpInferenceClient::new(url);
        let resp = client
            .invoke(InferenceRequest::text("current time"))
            .await
            .unwrap();
        match resp {
            InferenceResponse::Text(t) => assert_eq!(t, "2026-01-01T00:00:00Z"),
            other => panic!("expected text, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn structured_response_decodes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/invoke")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"green"}"#)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/invoke", server.url())).unwrap();
        let client = HttpInferenceClient::new(url);
        let resp = client
            .invoke(InferenceRequest::structured("summarize", json!({"type": "object"})))
            .await
            .unwrap();
        match resp {
            InferenceResponse::Structured(v) => assert_eq!(v["status"], "green"),
            other => panic!("expected structured, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/invoke")
            .with_status(503)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/invoke", server.url())).unwrap();
        let client = HttpInferenceClient::new(url);
        let err = client
            .invoke(InferenceRequest::text("ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Status(s) if s.as_u16() == 503));
        assert!(!err.is_network());
    }
}
