use std::{fmt, time::Duration};

use url::Url;

use crate::{
    error::{map_status_error, StatusErrorMapper},
    retry::DEFAULT_MAX_RETRIES,
    ArrayFormat, Headers, NexonError, NotGivenOr, Omittable, Query, QueryValue, Result, Timeout,
};

/// Production API origin.
pub const DEFAULT_BASE_URL: &str = "https://open.api.nexon.com";
/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "NEXON_OPENAPI_API_KEY";
/// Environment variable consulted when no base URL is passed explicitly.
pub const BASE_URL_ENV: &str = "NEXON_OPENAPI_BASE_URL";
/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-nxopen-api-key";
pub const DEFAULT_IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Connection pool sizing for the underlying transport.
///
/// There is no cap on total open connections: reqwest only bounds the idle
/// pool, so concurrent calls may open as many connections as they need.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectionLimits {
    /// Idle connections kept alive per host.
    pub max_idle_per_host: usize,
    /// How long an idle connection is kept. `None` keeps it indefinitely.
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

/// Default timeout: 600 s per attempt, 5 s to connect.
pub fn default_timeout() -> Timeout {
    Timeout {
        connect: Some(Duration::from_secs(5)),
        read: None,
        total: Some(Duration::from_secs(600)),
    }
}

/// Client-wide settings. Immutable once built; build a new client to change them.
#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: Url,
    default_headers: Headers,
    default_query: Query,
    timeout: Option<Timeout>,
    max_retries: u32,
    limits: ConnectionLimits,
    strict_response_validation: bool,
    array_format: ArrayFormat,
    idempotency_header: Option<String>,
    status_error_mapper: StatusErrorMapper,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .default_headers
            .entries()
            .iter()
            .map(|(name, value)| {
                let shown = match value {
                    _ if name == API_KEY_HEADER => "<redacted>",
                    Omittable::Value(value) => value.as_str(),
                    Omittable::Omit => "<omit>",
                };
                (name.as_str(), shown)
            })
            .collect();

        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("default_headers", &headers)
            .field("default_query", &self.default_query)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("limits", &self.limits)
            .field("strict_response_validation", &self.strict_response_validation)
            .field("array_format", &self.array_format)
            .field("idempotency_header", &self.idempotency_header)
            .finish()
    }
}

impl ClientConfig {
    /// Starts a builder with production defaults.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use nexon_openapi::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .api_key("my-api-key")
    ///     .timeout(Duration::from_secs(30))
    ///     .max_retries(4)
    ///     .build()
    ///     .expect("config");
    /// ```
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Builds a configuration from `NEXON_OPENAPI_API_KEY` and, when set,
    /// `NEXON_OPENAPI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// API key sent in `x-nxopen-api-key`.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Base URL, always ending with `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers sent on every request: content negotiation, user agent, API key,
    /// then any configured extras.
    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// Query parameters sent on every request.
    pub fn default_query(&self) -> &Query {
        &self.default_query
    }

    /// Timeout applied when a call does not set one. `None` means unbounded.
    pub fn timeout(&self) -> Option<Timeout> {
        self.timeout
    }

    /// Retries allowed per call unless the call overrides it.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Connection pool sizing.
    pub fn limits(&self) -> ConnectionLimits {
        self.limits
    }

    /// Whether a success body that does not match the expected type is an
    /// error right away, rather than after a lenient second decode.
    pub fn strict_response_validation(&self) -> bool {
        self.strict_response_validation
    }

    /// How list-valued query parameters are encoded.
    pub fn array_format(&self) -> ArrayFormat {
        self.array_format
    }

    /// Header that carries a call's idempotency key, if enabled.
    pub fn idempotency_header(&self) -> Option<&str> {
        self.idempotency_header.as_deref()
    }

    /// Maps a final non-success response onto an error kind.
    pub fn status_error_mapper(&self) -> StatusErrorMapper {
        self.status_error_mapper
    }

    /// `User-Agent` value sent by default.
    pub fn user_agent() -> String {
        format!("NexonOpenApi/Rust {}", env!("CARGO_PKG_VERSION"))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Clone)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    headers: Headers,
    query: Query,
    timeout: NotGivenOr<Option<Timeout>>,
    max_retries: u32,
    limits: ConnectionLimits,
    strict_response_validation: bool,
    array_format: ArrayFormat,
    idempotency_header: Option<String>,
    status_error_mapper: StatusErrorMapper,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            headers: Headers::new(),
            query: Query::new(),
            timeout: NotGivenOr::NotGiven,
            max_retries: DEFAULT_MAX_RETRIES,
            limits: ConnectionLimits::default(),
            strict_response_validation: true,
            array_format: ArrayFormat::default(),
            idempotency_header: Some(DEFAULT_IDEMPOTENCY_HEADER.to_owned()),
            status_error_mapper: map_status_error,
        }
    }
}

impl ClientConfigBuilder {
    /// Sets the API key. Falls back to `NEXON_OPENAPI_API_KEY`.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the API origin, optionally with a path prefix. Falls back to
    /// `NEXON_OPENAPI_BASE_URL`, then the production origin.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header sent on every request. [`Omittable::Omit`] removes a
    /// built-in header such as `content-type`.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl Into<Omittable<String>>,
    ) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a query parameter sent on every request.
    pub fn default_query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(name, value);
        self
    }

    /// Sets the default timeout. A bare [`Duration`] bounds each attempt.
    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = NotGivenOr::Given(Some(timeout.into()));
        self
    }

    /// Disables the default per-attempt timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = NotGivenOr::Given(None);
        self
    }

    /// Sets the default retry budget. `0` disables retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the connection pool sizing.
    pub fn limits(mut self, limits: ConnectionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Defaults to `true`.
    pub fn strict_response_validation(mut self, strict: bool) -> Self {
        self.strict_response_validation = strict;
        self
    }

    /// Defaults to [`ArrayFormat::Comma`].
    pub fn array_format(mut self, format: ArrayFormat) -> Self {
        self.array_format = format;
        self
    }

    /// Renames the header that carries idempotency keys.
    pub fn idempotency_header(mut self, name: impl Into<String>) -> Self {
        self.idempotency_header = Some(name.into());
        self
    }

    /// Never sends idempotency keys.
    pub fn without_idempotency_header(mut self) -> Self {
        self.idempotency_header = None;
        self
    }

    /// Replaces the status code to error kind mapping.
    pub fn status_error_mapper(mut self, mapper: StatusErrorMapper) -> Self {
        self.status_error_mapper = mapper;
        self
    }

    /// Validates the settings, falling back to the environment for the API
    /// key and base URL.
    pub fn build(self) -> Result<ClientConfig> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    fn build_with_env(self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        let api_key = self
            .api_key
            .or_else(|| env(API_KEY_ENV))
            .ok_or_else(|| {
                NexonError::Configuration(format!(
                    "the api key must be set either by passing it to the builder or by setting the {API_KEY_ENV} environment variable"
                ))
            })?;
        if api_key.trim().is_empty() {
            return Err(NexonError::Configuration("api key is set but empty".to_owned()));
        }

        let base_url = self
            .base_url
            .or_else(|| env(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = parse_base_url(&base_url)?;

        let mut default_headers = Headers::new()
            .with("accept", "application/json")
            .with("content-type", "application/json")
            .with("user-agent", ClientConfig::user_agent())
            .with(API_KEY_HEADER, api_key.clone());
        for (name, value) in self.headers.entries() {
            default_headers.insert(name, value.clone());
        }

        Ok(ClientConfig {
            api_key,
            base_url,
            default_headers,
            default_query: self.query,
            timeout: self.timeout.or(Some(default_timeout())),
            max_retries: self.max_retries,
            limits: self.limits,
            strict_response_validation: self.strict_response_validation,
            array_format: self.array_format,
            idempotency_header: self.idempotency_header,
            status_error_mapper: self.status_error_mapper,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| NexonError::Configuration(format!("invalid base url '{raw}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(NexonError::Configuration(format!(
            "base url '{raw}' cannot carry a path"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
