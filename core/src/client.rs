//! Request builder and response parser for the portal API.
//!
//! # Design
//! `PortalClient` holds the resolved base URL, the error policy and a
//! `SessionStore`. Building a request reads the token from the store every
//! time; nothing is cached between calls. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and `parse_response`,
//! which consumes the `HttpResponse`. The round-trip in between belongs to
//! the caller or to `Api`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ErrorPolicy};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionStore;

pub const CONTENT_TYPE: &str = "content-type";
pub const AUTHORIZATION: &str = "authorization";
const JSON_MEDIA_TYPE: &str = "application/json";

/// Synchronous client for the portal API. Performs no I/O itself.
#[derive(Debug, Clone)]
pub struct PortalClient<S> {
    base_url: String,
    error_policy: ErrorPolicy,
    store: S,
}

impl<S: SessionStore> PortalClient<S> {
    pub fn new(config: &ClientConfig, store: S) -> Self {
        Self {
            base_url: config.environment.base_url(),
            error_policy: config.error_policy,
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn build_get(&self, endpoint: &str) -> HttpRequest {
        self.build(HttpMethod::Get, endpoint, None)
    }

    pub fn build_post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.build(HttpMethod::Post, endpoint, Some(body)))
    }

    pub fn build_delete(&self, endpoint: &str) -> HttpRequest {
        self.build(HttpMethod::Delete, endpoint, None)
    }

    /// Check the status according to the error policy and parse the body as
    /// JSON. An empty body parses to `Value::Null`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        if !response.is_success() {
            match self.error_policy {
                ErrorPolicy::Strict => {
                    warn!(status = response.status, "API request failed");
                    return Err(ApiError::Http {
                        status: response.status,
                        body: response.body,
                    });
                }
                ErrorPolicy::Lenient => {
                    warn!(
                        status = response.status,
                        "API request failed, parsing error body as data"
                    );
                }
            }
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// `parse_response` followed by conversion into `T`.
    pub fn parse_response_as<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<T, ApiError> {
        let value = self.parse_response(response)?;
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    fn build(&self, method: HttpMethod, endpoint: &str, body: Option<String>) -> HttpRequest {
        let mut headers = vec![(CONTENT_TYPE.to_string(), JSON_MEDIA_TYPE.to_string())];
        let token = self.store.token();
        if let Some(ref token) = token {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }
        let url = format!("{}{endpoint}", self.base_url);
        debug!(%method, %url, authenticated = token.is_some(), "built API request");
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}
