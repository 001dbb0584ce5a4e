use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use reqwest::Method;
use serde_json::Value as JsonValue;
use tokio::time::sleep;

use crate::{
    engine::{Engine, Step},
    resources::FcOnline,
    response::ResponseShape,
    transport::{AsyncTransport, ReqwestTransport},
    ClientConfig, NexonError, RequestOptions, Result,
};

/// Async client for the Nexon Open API.
///
/// Cloning is cheap and every clone shares one connection pool. Once
/// [`NexonClient::close`] has been called on any clone, requests from all of
/// them fail with [`NexonError::Closed`].
#[derive(Clone)]
pub struct NexonClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    engine: Engine,
    transport: RwLock<Option<Arc<dyn AsyncTransport>>>,
}

impl fmt::Debug for NexonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NexonClient")
            .field("config", self.config())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl NexonClient {
    /// Creates a client backed by a pooled `reqwest` transport.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nexon_openapi::{ClientConfig, NexonClient};
    ///
    /// let config = ClientConfig::builder().api_key("my-api-key").build().expect("config");
    /// let client = NexonClient::new(config).expect("client");
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client that sends through `transport`.
    ///
    /// Useful for tests and for sharing a preconfigured `reqwest::Client`
    /// via [`ReqwestTransport::from_client`].
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn AsyncTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                engine: Engine::new(config),
                transport: RwLock::new(Some(transport)),
            }),
        }
    }

    /// Creates a client configured from `NEXON_OPENAPI_API_KEY` and
    /// `NEXON_OPENAPI_BASE_URL`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nexon_openapi::NexonClient;
    ///
    /// let client = NexonClient::from_env().expect("missing NEXON_OPENAPI_API_KEY");
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        self.inner.engine.config()
    }

    /// FC Online endpoints.
    pub fn fc_online(&self) -> FcOnline<'_> {
        FcOnline::new(self)
    }

    /// Releases the connection pool. Idempotent; in-flight calls finish on the
    /// transport they already hold.
    pub fn close(&self) {
        let released = self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if released.is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!("client closed");
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

    fn transport(&self) -> Result<Arc<dyn AsyncTransport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(NexonError::Closed)
    }

    /// Performs one logical call, retrying per the options and client defaults.
    ///
    /// `S` selects how a successful body is returned, e.g.
    /// [`Json<T>`](crate::Json), [`Text`](crate::Text) or [`Raw`](crate::Raw).
    pub async fn request<S: ResponseShape>(
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
            let outcome = transport.send(&request).await;
            let delay = match engine.resolve::<S>(&request, outcome, &budget, options)? {
                Step::Done(output) => return Ok(output),
                Step::Retry(delay) => delay,
            };
            budget.consume();
            sleep(delay).await;
        }
    }

    /// `GET path`. Query parameters come from the options.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn run(client: nexon_openapi::NexonClient) -> nexon_openapi::Result<()> {
    /// use nexon_openapi::{Query, RequestOptions, UnknownJson};
    ///
    /// let options = RequestOptions::new().with_query(Query::new().with("nickname", "Kit"));
    /// let _body = client.get::<UnknownJson>("fconline/v1/id", &options).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<S: ResponseShape>(&self, path: &str, options: &RequestOptions) -> Result<S::Output> {
        self.request::<S>(Method::GET, path, None, options).await
    }

    /// `POST path` with an optional JSON body, merged with `extra_json`.
    pub async fn post<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::POST, path, body, options).await
    }

    /// `PUT path` with an optional JSON body.
    pub async fn put<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::PUT, path, body, options).await
    }

    /// `PATCH path` with an optional JSON body.
    pub async fn patch<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::PATCH, path, body, options).await
    }

    /// `DELETE path` with an optional JSON body.
    pub async fn delete<S: ResponseShape>(
        &self,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<S::Output> {
        self.request::<S>(Method::DELETE, path, body, options).await
    }
}
