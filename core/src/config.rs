//! Client configuration: where the backend lives and how strictly responses
//! are checked.
//!
//! # Design
//! The base URL is an explicit `ApiEnvironment` passed to the client at
//! construction. `ApiEnvironment::detect` keeps the portal's dev-mode
//! heuristic available for callers that only know the page location:
//! a page served from `localhost`/`127.0.0.1` on any port other than the
//! backend's talks cross-origin to `http://127.0.0.1:<port>/api`, everything
//! else uses the same-origin `/api` prefix.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::ConfigError;

/// Port the portal backend listens on.
pub const DEFAULT_BACKEND_PORT: u16 = 5001;

/// Path prefix every API endpoint lives under.
pub const API_PREFIX: &str = "/api";

/// Transport timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_API_ORIGIN: &str = "PORTAL_API_ORIGIN";
const ENV_PAGE_URL: &str = "PORTAL_PAGE_URL";
const ENV_BACKEND_PORT: &str = "PORTAL_BACKEND_PORT";
const ENV_ERROR_POLICY: &str = "PORTAL_ERROR_POLICY";
const ENV_TIMEOUT_SECS: &str = "PORTAL_TIMEOUT_SECS";

/// Hostname and port the frontend page is served from.
///
/// `port` is `None` when the page uses the scheme's default port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub hostname: String,
    pub port: Option<u16>,
}

impl PageLocation {
    pub fn new(hostname: &str, port: Option<u16>) -> Self {
        Self {
            hostname: hostname.to_string(),
            port,
        }
    }

    /// Parse the location out of a full page URL such as
    /// `http://localhost:8000/doctor.html`.
    pub fn from_url(page_url: &str) -> Result<Self, ConfigError> {
        let url = parse_page_url(page_url)?;
        let hostname = url.host_str().ok_or_else(|| ConfigError::InvalidPageUrl {
            url: page_url.to_string(),
            reason: "URL has no host".to_string(),
        })?;
        // `Url::port` is already `None` for the scheme's default port.
        Ok(Self::new(hostname, url.port()))
    }

    fn is_loopback(&self) -> bool {
        matches!(self.hostname.as_str(), "localhost" | "127.0.0.1")
    }
}

/// Where API requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEnvironment {
    /// Scheme + host (+ port) of the backend, without a trailing slash.
    /// Ignored when `use_relative_path` is set.
    pub backend_origin: String,
    /// Send requests to the origin-relative `/api` prefix.
    pub use_relative_path: bool,
}

impl ApiEnvironment {
    /// Same-origin deployment: the page is served by the backend itself.
    pub fn relative() -> Self {
        Self {
            backend_origin: String::new(),
            use_relative_path: true,
        }
    }

    /// Cross-origin deployment against an explicit backend origin.
    pub fn cross_origin(backend_origin: &str) -> Self {
        Self {
            backend_origin: backend_origin.trim_end_matches('/').to_string(),
            use_relative_path: false,
        }
    }

    /// Dev-mode detection from the page location.
    pub fn detect(page: &PageLocation, backend_port: u16) -> Self {
        let env = if page.is_loopback() && page.port != Some(backend_port) {
            Self::cross_origin(&format!("http://127.0.0.1:{backend_port}"))
        } else {
            Self::relative()
        };
        debug!(
            hostname = %page.hostname,
            port = ?page.port,
            base_url = %env.base_url(),
            "resolved API environment"
        );
        env
    }

    /// Prefix prepended to every endpoint.
    pub fn base_url(&self) -> String {
        if self.use_relative_path {
            API_PREFIX.to_string()
        } else {
            format!("{}{API_PREFIX}", self.backend_origin)
        }
    }
}

impl Default for ApiEnvironment {
    fn default() -> Self {
        Self::relative()
    }
}

/// How non-2xx responses are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Every non-2xx response becomes `ApiError::Http`.
    #[default]
    Strict,
    /// Parse the body of an error response as if it were data. Kept for
    /// pages written against the legacy client that read `{message}` out of
    /// failed responses.
    Lenient,
}

impl ErrorPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(ErrorPolicy::Strict),
            "lenient" => Some(ErrorPolicy::Lenient),
            _ => None,
        }
    }
}

/// Everything `PortalClient` and `UreqTransport` need to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub environment: ApiEnvironment,
    pub error_policy: ErrorPolicy,
    pub timeout: Duration,
    /// Origin of the page (`scheme://host[:port]`). Origin-relative request
    /// URLs are resolved against it.
    pub page_origin: Option<String>,
}

impl ClientConfig {
    pub fn new(environment: ApiEnvironment) -> Self {
        Self {
            environment,
            error_policy: ErrorPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            page_origin: None,
        }
    }

    pub fn with_page_origin(mut self, page_origin: &str) -> Self {
        self.page_origin = Some(page_origin.trim_end_matches('/').to_string());
        self
    }

    /// Origin that `/api/...` URLs resolve against, or `None` when requests
    /// are already absolute.
    ///
    /// Same-origin mode without a known page origin is a configuration
    /// error: nothing could be sent.
    pub fn request_origin(&self) -> Result<Option<&str>, ConfigError> {
        if !self.environment.use_relative_path {
            return Ok(None);
        }
        self.page_origin
            .as_deref()
            .map(Some)
            .ok_or(ConfigError::MissingPageOrigin)
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a config from `PORTAL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// An explicit origin wins over page-URL detection; with neither the
    /// client uses the relative `/api` prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_port = match lookup(ENV_BACKEND_PORT) {
            Some(raw) => parse_value::<u16>(ENV_BACKEND_PORT, &raw)?,
            None => DEFAULT_BACKEND_PORT,
        };

        let page_origin = match lookup(ENV_PAGE_URL) {
            Some(page_url) => Some(page_origin_of(&page_url)?),
            None => None,
        };

        let environment = match (lookup(ENV_API_ORIGIN), lookup(ENV_PAGE_URL)) {
            (Some(origin), _) if !origin.trim().is_empty() => {
                ApiEnvironment::cross_origin(origin.trim())
            }
            (_, Some(page_url)) => {
                ApiEnvironment::detect(&PageLocation::from_url(&page_url)?, backend_port)
            }
            _ => ApiEnvironment::relative(),
        };

        let error_policy = match lookup(ENV_ERROR_POLICY) {
            Some(raw) => ErrorPolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: ENV_ERROR_POLICY.to_string(),
                value: raw,
            })?,
            None => ErrorPolicy::default(),
        };

        let timeout = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_value::<u64>(ENV_TIMEOUT_SECS, &raw)?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            environment,
            error_policy,
            timeout,
            page_origin,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(ApiEnvironment::default())
    }
}

fn parse_page_url(page_url: &str) -> Result<Url, ConfigError> {
    Url::parse(page_url).map_err(|e| ConfigError::InvalidPageUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })
}

/// `scheme://host[:port]` of a page URL.
fn page_origin_of(page_url: &str) -> Result<String, ConfigError> {
    let origin = parse_page_url(page_url)?.origin();
    if !origin.is_tuple() {
        return Err(ConfigError::InvalidPageUrl {
            url: page_url.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    Ok(origin.ascii_serialization())
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
