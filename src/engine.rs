//! Request building and response interpretation shared by the async and
//! blocking clients.
//!
//! The engine never touches the network or sleeps. A client drives it:
//! build a request, hand it to a transport, feed the outcome back through
//! [`Engine::resolve`], and either return the value or wait and go again.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde_json::{Map, Value as JsonValue};
use url::Url;

use crate::{
    params::{merge_mappings, serialize_query},
    response::{ParseContext, ResponseShape},
    retry::{decide_next_action, Failure, NextAction, RetryBudget},
    transport::{PreparedRequest, RawResponse, TransportFailure},
    ApiStatusError, ClientConfig, NexonError, RequestOptions, Result,
};

/// Outcome of one attempt as seen by the driving client.
#[derive(Debug)]
pub(crate) enum Step<T> {
    Done(T),
    Retry(Duration),
}

#[derive(Debug)]
pub(crate) struct Engine {
    config: ClientConfig,
}

impl Engine {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn retry_budget(&self, options: &RequestOptions) -> RetryBudget {
        RetryBudget::new(options.max_retries.unwrap_or(self.config.max_retries()))
    }

    /// Builds one outbound request. Identical inputs give identical requests.
    pub(crate) fn build_request(
        &self,
        method: &Method,
        path: &str,
        body: Option<&JsonValue>,
        options: &RequestOptions,
    ) -> Result<PreparedRequest> {
        #[cfg(feature = "tracing")]
        tracing::debug!(?options, "request options");

        let headers = self.build_headers(options)?;
        let url = self.prepare_url(path, options)?;
        let body = match merge_json_body(body, options.extra_json.as_ref())? {
            Some(body) => Some(Bytes::from(serde_json::to_vec(&body).map_err(|err| {
                NexonError::InvalidRequest(format!("failed to encode JSON body: {err}"))
            })?)),
            None => None,
        };
        let timeout = options
            .timeout
            .or(self.config.timeout())
            .and_then(|timeout| timeout.attempt_bound());

        Ok(PreparedRequest {
            method: method.clone(),
            url,
            headers,
            body,
            timeout,
        })
    }

    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut merged = merge_mappings(
            self.config.default_headers().entries(),
            options.headers.entries(),
        );

        if let (Some(key), Some(name)) = (&options.idempotency_key, self.config.idempotency_header()) {
            let name = name.to_ascii_lowercase();
            if !merged.iter().any(|(existing, _)| *existing == name) {
                merged.push((name, key.clone()));
            }
        }

        let mut headers = HeaderMap::with_capacity(merged.len());
        for (name, value) in merged {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                NexonError::InvalidRequest(format!("invalid header name '{name}': {err}"))
            })?;
            let header_value = HeaderValue::from_str(&value).map_err(|err| {
                NexonError::InvalidRequest(format!("invalid value for header '{name}': {err}"))
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    /// Joins `path` under the base URL and appends the merged query.
    fn prepare_url(&self, path: &str, options: &RequestOptions) -> Result<Url> {
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            self.config.base_url().join(path.trim_start_matches('/'))
        }
        .map_err(|err| NexonError::InvalidRequest(format!("invalid request path '{path}': {err}")))?;

        let params = merge_mappings(
            self.config.default_query().entries(),
            options.query.entries(),
        );
        let pairs = serialize_query(&params, self.config.array_format());
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// Interprets one attempt's outcome against the remaining retry budget.
    pub(crate) fn resolve<S: ResponseShape>(
        &self,
        request: &PreparedRequest,
        outcome: std::result::Result<RawResponse, TransportFailure>,
        budget: &RetryBudget,
        options: &RequestOptions,
    ) -> Result<Step<S::Output>> {
        let response = match outcome {
            Ok(response) => response,
            Err(failure) => return self.resolve_transport_failure(request, failure, budget),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            "HTTP request"
        );

        if response.is_success() {
            let ctx = ParseContext {
                url: request.url.as_str(),
                strict: self.config.strict_response_validation(),
                post_parser: options.post_parser.as_ref(),
            };
            return S::parse(response, &ctx).map(Step::Done);
        }

        let failure = Failure::Status {
            status: response.status,
            headers: &response.headers,
        };
        match decide_next_action(&failure, budget) {
            NextAction::Retry(delay) => {
                log_retry(request, delay);
                Ok(Step::Retry(delay))
            }
            NextAction::Fail => {
                let err = ApiStatusError::from_response(
                    request.method.clone(),
                    request.url.to_string(),
                    response.status,
                    response.headers,
                    &response.body,
                );
                Err((self.config.status_error_mapper())(err))
            }
        }
    }

    fn resolve_transport_failure<T>(
        &self,
        request: &PreparedRequest,
        failure: TransportFailure,
        budget: &RetryBudget,
    ) -> Result<Step<T>> {
        let kind = match &failure {
            TransportFailure::Network(_) => Failure::Network,
            TransportFailure::Timeout(_) => Failure::Timeout,
            TransportFailure::Rejected(source) => {
                return Err(NexonError::InvalidRequest(format!(
                    "{} {} rejected by the http client: {source}",
                    request.method, request.url
                )));
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            reason = ?failure,
            "HTTP request failed"
        );

        match decide_next_action(&kind, budget) {
            NextAction::Retry(delay) => {
                log_retry(request, delay);
                Ok(Step::Retry(delay))
            }
            NextAction::Fail => {
                let method = request.method.clone();
                let url = request.url.to_string();
                Err(match failure {
                    TransportFailure::Network(source) => NexonError::Connection { method, url, source },
                    TransportFailure::Timeout(source) => NexonError::Timeout { method, url, source },
                    TransportFailure::Rejected(source) => NexonError::InvalidRequest(source.to_string()),
                })
            }
        }
    }
}

fn log_retry(request: &PreparedRequest, delay: Duration) {
    #[cfg(feature = "tracing")]
    tracing::info!(
        "Retrying request to {} in {:.3} seconds",
        request.url,
        delay.as_secs_f64()
    );

    #[cfg(not(feature = "tracing"))]
    let _ = (request, delay);
}

/// Overlays `extra` on the method-supplied body. Fails when `extra` is set and
/// the body is not a JSON object.
fn merge_json_body(
    body: Option<&JsonValue>,
    extra: Option<&Map<String, JsonValue>>,
) -> Result<Option<JsonValue>> {
    match (body, extra) {
        (body, None) => Ok(body.cloned()),
        (None, Some(extra)) => Ok(Some(JsonValue::Object(extra.clone()))),
        (Some(JsonValue::Object(body)), Some(extra)) => {
            let mut merged = body.clone();
            merged.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
            Ok(Some(JsonValue::Object(merged)))
        }
        (Some(other), Some(_)) => Err(NexonError::InvalidRequest(format!(
            "cannot merge extra JSON fields into a non-object body: {other}"
        ))),
    }
}
