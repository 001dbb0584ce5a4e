//! Boundary between the engine and the underlying HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::HeaderMap, Method};
use url::Url;

use crate::{error::BoxError, ClientConfig, NexonError, Result};

/// One fully built outbound request.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Bound on this attempt only.
    pub timeout: Option<Duration>,
}

/// Fully buffered response.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Attempt that produced no response.
#[derive(Debug)]
pub enum TransportFailure {
    /// Connection refused, DNS failure, broken body stream and the like.
    Network(BoxError),
    Timeout(BoxError),
    /// The request was rejected before it left, e.g. by the client builder
    /// or the redirect policy. Retrying gives the same result.
    Rejected(BoxError),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Box::new(err))
        } else if err.is_builder() || err.is_redirect() {
            Self::Rejected(Box::new(err))
        } else {
            Self::Network(Box::new(err))
        }
    }
}

/// Redirects are never followed. The API key travels in a custom header that
/// reqwest would forward to any host a `Location` points at, so a 3xx is
/// returned as is and surfaces as a status error.
pub(crate) fn redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::none()
}

/// Sends requests without blocking the calling thread.
///
/// Implementations must be safe to share between concurrent calls; any
/// connection limiting happens inside the transport.
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> std::result::Result<RawResponse, TransportFailure>;
}

/// [`AsyncTransport`] backed by a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a connection pool sized by the config's limits and connect timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let limits = config.limits();
        let mut builder = reqwest::Client::builder()
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
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AsyncTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> std::result::Result<RawResponse, TransportFailure> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // Read to completion so the connection goes back to the pool.
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::TransportFailure;

    #[tokio::test]
    async fn builder_errors_are_rejected_not_retried_as_network() {
        let err = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .expect_err("unparseable url");
        assert!(err.is_builder());
        assert!(matches!(TransportFailure::from(err), TransportFailure::Rejected(_)));
    }
}
