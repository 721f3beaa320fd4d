//! Resolver client

use std::sync::Arc;

use adriver_core::{AdriverResult, ResolverError};
use async_trait::async_trait;
use tracing::debug;

use crate::transport::{ResolverRequest, Transport};
use crate::types::{Resolution, ResolverResponse};
use crate::IdentityResolver;

/// Longest error body kept in a `RequestFailed` message.
const MAX_ERROR_BODY: usize = 256;

/// Clip an error body to [`MAX_ERROR_BODY`] bytes on a char boundary.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

/// Calls the identity-resolution endpoint through a [`Transport`].
pub struct ResolverClient<T: Transport> {
    transport: Arc<T>,
    endpoint: String,
}

impl<T: Transport> ResolverClient<T> {
    /// Create a client for `endpoint`.
    ///
    /// # Arguments
    /// * `transport` - Performs the HTTP call
    /// * `endpoint` - Resolver URL (e.g., "https://sspid.adriver.ru/adriverid")
    pub fn new(transport: Arc<T>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: Transport> IdentityResolver for ResolverClient<T> {
    async fn resolve(&self) -> AdriverResult<Resolution> {
        let request = ResolverRequest::get(&self.endpoint);
        debug!(endpoint = %self.endpoint, "dispatching identity resolution");

        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            return Err(ResolverError::RequestFailed {
                endpoint: self.endpoint.clone(),
                status: response.status,
                message: truncate_body(&response.body),
            }
            .into());
        }

        let parsed: ResolverResponse =
            serde_json::from_str(&response.body).map_err(|e| ResolverError::InvalidResponse {
                endpoint: self.endpoint.clone(),
                reason: format!("Failed to parse response: {}", e),
            })?;

        parsed
            .into_resolution()
            .map_err(|reason| {
                ResolverError::InvalidResponse {
                    endpoint: self.endpoint.clone(),
                    reason,
                }
                .into()
            })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<T: Transport> std::fmt::Debug for ResolverClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
