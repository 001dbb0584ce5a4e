//! Blocking counterpart of [`crate::NexonClient`].
//!
//! Same configuration, retry rules and error mapping; each call holds the
//! calling thread until it completes, including any backoff waits. Do not
//! create or drop this client from inside an async runtime.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
    thread,
};

use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::{
    engine::{Engine, Step},
    resources::FcOnlineBlocking,
    response::ResponseShape,
    transport::{redirect_policy, PreparedRequest, RawResponse, TransportFailure},
    ClientConfig, NexonError, RequestOptions, Result,
};

/// Sends requests on the calling thread.
pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: &PreparedRequest) -> std::result::Result<RawResponse, TransportFailure>;
}

/// [`BlockingTransport`] backed by a pooled `reqwest::blocking::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestBlockingTransport {
    http: reqwest::blocking::Client,
}

impl ReqwestBlockingTransport {
    /// Builds a connection pool sized by the config's limits and connect timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let limits = config.limits();
        // The blocking builder defaults to a 30 s timeout; attempts carry their own.
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(None)
            .redirect(redirect_policy())
            .pool_max_idle_per_host(limits.max_idle_per_host)
            .pool_idle_timeout(limits.idle_timeout);
        if let Some(connect) = config.timeout().and_then(|timeout| timeout.connect) {
            builder = builder.connect_timeout(connect);
        }

        let http = builder.build().map_err(|err| {
            NexonError::Configuration(format!("failed to build http client: {err}"))
        })?;
        Ok(Self { http })
    }

    /// Wraps an already configured client.
    pub fn from_client(http: reqwest::blocking::Client) -> Self {
        Self { http }
    }
}

impl BlockingTransport for ReqwestBlockingTransport {
    fn send(&self, request: &PreparedRequest) -> std::result::Result<RawResponse, TransportFailure> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Blocking client for the Nexon Open API.
#[derive(Clone)]
pub struct NexonClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    engine: Engine,
    transport: RwLock<Option<Arc<dyn BlockingTransport>>>,
}

impl fmt::Debug for NexonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("blocking::NexonClient")
            .field("config", self.config())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl NexonClient {
    /// Creates a client backed by a pooled blocking `reqwest` transport.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nexon_openapi::{blocking::NexonClient, ClientConfig};
    ///
    /// let config = ClientConfig::builder().api_key("my-api-key").build().expect("config");
    /// let client = NexonClient::new(config).expect("client");
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestBlockingTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client that sends through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn BlockingTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                engine: Engine::new(config),
                transport: RwLock::new(Some(transport)),
            }),
        }
    }

    /// Creates a client configured from `NEXON_OPENAPI_API_KEY` and
    /// `NEXON_OPENAPI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        self.inner.engine.config()
    }

    /// FC Online endpoints.
    pub fn fc_online(&self) -> FcOnlineBlocking<'_> {
        FcOnlineBlocking::new(self)
    }

    /// Releases the connection pool. Idempotent.
    pub fn close(&self) {
        let released = self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if released.is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!("blocking client closed");
        }

        drop(released);
    }

    /// Whether [`NexonClient::close`] has been called on any clone.
    pub fn is_closed(&self) -> bool {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn transport(&self) -> Result<Arc<dyn BlockingTransport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(NexonError::Closed)
    }

    /// Performs one logical call, sleeping the calling thread between retries.
    pub fn request<S: ResponseShape>(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        let transport = self.transport()?;
        let engine = &self.inner.engine;
        let mut budget = engine.retry_budget(options);

        loop {
            let request = engine.build_request(&method, path, body, options)?;
            let outcome = transport.send(&request);
            let delay = match engine.resolve::<S>(&request, outcome, &budget, options)? {
                Step::Done(output) => return Ok(output),
                Step::Retry(delay) => delay,
            };
            budget.consume();
            thread::sleep(delay);
        }
    }

    /// `GET path`. Query parameters come from the options.
    pub fn get<S: ResponseShape>(&self, path: &str, options: &RequestOptions) -> Result<S::Output> {
        self.request::<S>(Method::GET, path, None, options)
    }

    /// `POST path` with an optional JSON body, merged with `extra_json`.
    pub fn post<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::POST, path, body, options)
    }

    /// `PUT path` with an optional JSON body.
    pub fn put<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::PUT, path, body, options)
    }

    /// `PATCH path` with an optional JSON body.
    pub fn patch<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::PATCH, path, body, options)
    }

    /// `DELETE path` with an optional JSON body.
    pub fn delete<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::DELETE, path, body, options)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use bytes::Bytes;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::{BlockingTransport, NexonClient};
    use crate::{
        transport::{PreparedRequest, RawResponse, TransportFailure},
        ClientConfig, Json, NexonError, RequestOptions, Text, UnknownJson,
    };

    type Outcome = std::result::Result<RawResponse, TransportFailure>;

    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Outcome>>,
        hits: Mutex<usize>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Outcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                hits: Mutex::new(0),
            })
        }

        fn hits(&self) -> usize {
            *self.hits.lock().expect("lock")
        }
    }

    impl BlockingTransport for ScriptedTransport {
        fn send(&self, _request: &PreparedRequest) -> Outcome {
            *self.hits.lock().expect("lock") += 1;
            self.outcomes
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(TransportFailure::Network("script exhausted".into())))
        }
    }

    fn status(status: u16, body: &str) -> Outcome {
        Ok(RawResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_owned()),
        })
    }

    fn retry_now(status: u16) -> Outcome {
        // A tiny hint keeps the test fast without bypassing the retry path.
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("0.01"));
        Ok(RawResponse {
            status,
            headers,
            body: Bytes::new(),
        })
    }

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .api_key("test-key")
            .base_url("https://open.api.nexon.com")
            .build()
            .expect("config")
    }

    #[test]
    fn retries_then_succeeds() {
        let transport = ScriptedTransport::new(vec![retry_now(503), status(200, r#"{"n":1}"#)]);
        let client = NexonClient::with_transport(config(), transport.clone());

        let started = Instant::now();
        let body = client
            .get::<UnknownJson>("fconline/v1/id", &RequestOptions::new())
            .expect("second attempt succeeds");

        assert_eq!(body["n"], 1);
        assert_eq!(transport.hits(), 2);
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn exhausted_retries_surface_last_status() {
        let transport = ScriptedTransport::new(vec![retry_now(429), retry_now(429), retry_now(429)]);
        let client = NexonClient::with_transport(config(), transport.clone());

        let err = client
            .get::<UnknownJson>("fconline/v1/id", &RequestOptions::new())
            .expect_err("rate limited");

        assert!(matches!(err, NexonError::RateLimit(_)));
        assert_eq!(transport.hits(), 3);
    }

    #[test]
    fn terminal_status_is_not_retried() {
        let transport = ScriptedTransport::new(vec![status(401, r#"{"error":{"name":"OPENAPI00005","message":"bad key"}}"#)]);
        let client = NexonClient::with_transport(config(), transport.clone());

        let err = client
            .get::<Json<String>>("fconline/v1/id", &RequestOptions::new())
            .expect_err("unauthorized");

        match err {
            NexonError::Authentication(status) => {
                assert_eq!(status.error_message(), Some("bad key"));
            }
            other => panic!("expected authentication error, got {other:?}"),
        }
        assert_eq!(transport.hits(), 1);
    }

    #[test]
    fn text_shape_returns_body() {
        let transport = ScriptedTransport::new(vec![status(200, "plain")]);
        let client = NexonClient::with_transport(config(), transport);

        let body = client
            .get::<Text>("static/page", &RequestOptions::new())
            .expect("text");
        assert_eq!(body, "plain");
    }

    #[test]
    fn close_is_idempotent_and_blocks_calls() {
        let transport = ScriptedTransport::new(vec![status(200, "{}")]);
        let client = NexonClient::with_transport(config(), transport.clone());

        client.close();
        client.close();

        assert!(client.is_closed());
        let err = client
            .get::<UnknownJson>("fconline/v1/id", &RequestOptions::new())
            .expect_err("closed");
        assert!(matches!(err, NexonError::Closed));
        assert_eq!(transport.hits(), 0);
    }
}
