//! Blocking HTTP execution of `HttpRequest` values.
//!
//! # Design
//! `Transport` is the seam between the pure client and the network. The
//! provided `UreqTransport` turns off ureq's status-code-as-error behavior so
//! 4xx/5xx responses come back as data and `PortalClient` alone decides what
//! counts as a failure. Only a missing response is a transport error.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use crate::error::{ApiError, ConfigError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a request and returns whatever response the server produced.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// `Transport` backed by a shared `ureq::Agent` with a global timeout.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    /// Origin used to complete origin-relative request URLs.
    origin: Option<String>,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, origin: None }
    }

    /// Transport for `config`, resolving origin-relative URLs against the
    /// configured page origin. Fails when same-origin mode has no origin.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = Self::new(config.timeout);
        Ok(match config.request_origin()? {
            Some(origin) => transport.with_origin(origin),
            None => transport,
        })
    }

    /// Resolve `/api/...` URLs against `origin`, the way a browser resolves
    /// them against the page that issued them.
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.trim_end_matches('/').to_string());
        self
    }

    fn absolute_url(&self, url: &str) -> Result<String, ApiError> {
        if !url.starts_with('/') {
            return Ok(url.to_string());
        }
        match self.origin {
            Some(ref origin) => Ok(format!("{origin}{url}")),
            None => Err(ApiError::Network(format!(
                "cannot send origin-relative URL {url} without a configured origin"
            ))),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = self.absolute_url(&request.url)?;
        debug!(method = %request.method, %url, "sending API request");

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match request.body {
                    Some(ref body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| {
            warn!(method = %request.method, %url, error = %e, "API request got no response");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))?;

        debug!(%url, status, "received API response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
