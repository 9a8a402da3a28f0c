//! The `get` / `post` / `del` facade pages call.
//!
//! Each call builds the request with `PortalClient`, hands it to the
//! `Transport` and parses the response. The first failure is returned; there
//! are no retries at this layer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::PortalClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};
use crate::session::SessionStore;
use crate::transport::{Transport, UreqTransport};

pub struct Api<S, T> {
    client: PortalClient<S>,
    transport: T,
}

impl<S: SessionStore> Api<S, UreqTransport> {
    /// Facade over a `UreqTransport` configured from `config`.
    ///
    /// Same-origin configs must carry a page origin, otherwise no request
    /// could ever be sent and construction fails.
    pub fn from_config(config: &ClientConfig, store: S) -> Result<Self, ConfigError> {
        let transport = UreqTransport::from_config(config)?;
        Ok(Self::new(PortalClient::new(config, store), transport))
    }
}

impl<S: SessionStore, T: Transport> Api<S, T> {
    pub fn new(client: PortalClient<S>, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &PortalClient<S> {
        &self.client
    }

    pub fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.get_as(endpoint)
    }

    pub fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        self.post_as(endpoint, body)
    }

    pub fn del(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.del_as(endpoint)
    }

    pub fn get_as<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        let response = self.transport.execute(self.client.build_get(endpoint))?;
        self.client.parse_response_as(response)
    }

    pub fn post_as<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let request = self.client.build_post(endpoint, body)?;
        let response = self.transport.execute(request)?;
        self.client.parse_response_as(response)
    }

    pub fn del_as<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        let response = self.transport.execute(self.client.build_delete(endpoint))?;
        self.client.parse_response_as(response)
    }
}
