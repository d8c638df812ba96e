//! Reqwest HTTP Transport Adapter
//!
//! Implements the `HttpTransport` port over `reqwest` with rustls.

use crate::domain::{TransportError, TransportErrorKind};
use crate::ports::outbound::{HttpBody, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with a default per-request timeout.
    pub fn new(default_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(default_timeout)
            .connect_timeout(default_timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
        Ok(Self {
            client,
            default_timeout,
        })
    }
}

/// Map a reqwest failure to a tagged transport error.
pub(crate) fn classify(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Other
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("[qc-18] {:?} {}", request.method, request.url);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        builder = builder.timeout(request.timeout.unwrap_or(self.default_timeout));
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            HttpBody::Empty => builder,
            HttpBody::Json(body) => builder.json(&body),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(classify(&e), e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(classify(&e), e.to_string()))?;
        // Non-JSON bodies (HTML error pages) become Null.
        let body = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);

        Ok(HttpResponse { status, body })
    }
}
