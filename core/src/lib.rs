//! Client core for the hospital portal's JSON REST API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). `Api` glues the builder to a
//! blocking `Transport` for callers that just want `get` / `post` / `del`.
//!
//! # Design
//! - The base URL comes from an explicit `ApiEnvironment`; dev-mode
//!   detection from the page location is opt-in via `ApiEnvironment::detect`.
//! - Credentials are read through the `SessionStore` trait on every request
//!   and attached as `Authorization: Bearer <token>` only when present.
//! - Non-2xx responses are `ApiError::Http` under the default strict policy.
//! - `logout` and `check_auth` drive page navigation through the
//!   `Navigator` trait so they can run outside a browser.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod session;
pub mod transport;

pub use api::Api;
pub use client::PortalClient;
pub use config::{ApiEnvironment, ClientConfig, ErrorPolicy, PageLocation, DEFAULT_BACKEND_PORT};
pub use error::{ApiError, ConfigError, StorageError};
pub use guard::{check_auth, login_url, logout, AuthOutcome, Navigator};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{FileStorage, MemoryStorage, SessionStore, ROLE_KEY, TOKEN_KEY};
pub use transport::{Transport, UreqTransport};
