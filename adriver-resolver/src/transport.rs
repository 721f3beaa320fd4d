//! HTTP transport

use adriver_core::{AdriverResult, ResolverError};
use async_trait::async_trait;
use reqwest::Client;

/// An outbound GET. No body, no query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Send ambient cookies with the request.
    pub with_credentials: bool,
}

impl ResolverRequest {
    /// The request the resolver makes: JSON content type, credentials on.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            with_credentials: true,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the network call.
///
/// A transport reports non-2xx statuses as a normal [`TransportResponse`];
/// `Err` is reserved for failures where no response arrived.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ResolverRequest) -> AdriverResult<TransportResponse>;
}

/// reqwest-backed transport.
///
/// The client keeps a cookie store, so identity cookies set by the resolver
/// ride along on later requests the way credentialed browser requests do.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> AdriverResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ResolverError::RequestFailed {
                endpoint: String::new(),
                status: 0,
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ResolverRequest) -> AdriverResult<TransportResponse> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ResolverError::RequestFailed {
                endpoint: request.url.clone(),
                status: 0,
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ResolverError::InvalidResponse {
                endpoint: request.url.clone(),
                reason: format!("Failed to read body: {}", e),
            })?;

        Ok(TransportResponse { status, body })
    }
}
