use std::{fmt, sync::Arc, time::Duration};

use serde_json::{Map, Value as JsonValue};

use crate::{Headers, NotGivenOr, Query};

/// Hook applied to a parsed JSON body before it is decoded into the result type.
pub type PostParser = Arc<dyn Fn(JsonValue) -> JsonValue + Send + Sync>;

/// Timeout settings for one attempt.
///
/// `total` bounds a single attempt's transport wait; when it is unset `read`
/// is used instead.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Timeout {
    /// Only read from the client configuration, when the connection pool is
    /// built. A per-call `connect` is ignored; the pool's connect timeout
    /// still applies to that call.
    pub connect: Option<Duration>,
    pub read: Option<Duration>,
    pub total: Option<Duration>,
}

impl Timeout {
    /// Same bound for every phase.
    pub fn all(duration: Duration) -> Self {
        Self {
            connect: Some(duration),
            read: Some(duration),
            total: Some(duration),
        }
    }

    pub fn with_connect(mut self, connect: Duration) -> Self {
        self.connect = Some(connect);
        self
    }

    /// Upper bound for one attempt.
    pub fn attempt_bound(&self) -> Option<Duration> {
        self.total.or(self.read)
    }
}

impl From<Duration> for Timeout {
    fn from(total: Duration) -> Self {
        Self {
            total: Some(total),
            ..Self::default()
        }
    }
}

/// Per-call overrides.
///
/// Values are read, never mutated, by the engine for the whole logical call,
/// including every retry.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub headers: Headers,
    pub query: Query,
    pub extra_json: Option<Map<String, JsonValue>>,
    /// `NotGiven` uses the client default; `Given(None)` disables the timeout.
    pub timeout: NotGivenOr<Option<Timeout>>,
    /// `Some(0)` disables retries for this call.
    pub max_retries: Option<u32>,
    pub idempotency_key: Option<String>,
    pub post_parser: Option<PostParser>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("extra_json", &self.extra_json)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("idempotency_key", &self.idempotency_key)
            .field("post_parser", &self.post_parser.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the per-call headers. They override client defaults by name.
    pub fn with_headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Sets one header. [`crate::Omittable::Omit`] removes a default header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<crate::Omittable<String>>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the per-call query parameters.
    pub fn with_query(mut self, query: impl Into<Query>) -> Self {
        self.query = query.into();
        self
    }

    /// Overlays extra query parameters on top of the ones already set.
    pub fn merge_query(mut self, extra: &Query) -> Self {
        self.query.extend(extra);
        self
    }

    /// Fields merged into the top level of the JSON body.
    pub fn with_extra_json(mut self, extra: Map<String, JsonValue>) -> Self {
        self.extra_json = Some(extra);
        self
    }

    /// Overrides the client timeout for this call only.
    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = NotGivenOr::Given(Some(timeout.into()));
        self
    }

    /// Sends this call without any per-attempt timeout.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = NotGivenOr::Given(None);
        self
    }

    /// Overrides the client retry budget. `0` means a single attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Key sent in the idempotency header on every attempt of this call.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Transforms the parsed JSON before it is decoded into the result type.
    pub fn with_post_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(JsonValue) -> JsonValue + Send + Sync + 'static,
    {
        self.post_parser = Some(Arc::new(parser));
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{RequestOptions, Timeout};
    use crate::{NotGivenOr, Omittable, Query, QueryValue};

    #[test]
    fn defaults_leave_everything_unset() {
        let options = RequestOptions::new();
        assert!(options.headers.is_empty());
        assert!(options.query.is_empty());
        assert!(!options.timeout.is_given());
        assert_eq!(options.max_retries, None);
    }

    #[test]
    fn explicit_zero_retries_is_kept() {
        assert_eq!(RequestOptions::new().with_max_retries(0).max_retries, Some(0));
    }

    #[test]
    fn timeout_states() {
        let disabled = RequestOptions::new().without_timeout();
        assert_eq!(disabled.timeout, NotGivenOr::Given(None));

        let set = RequestOptions::new().with_timeout(Duration::from_secs(3));
        assert_eq!(
            set.timeout.given().copied().flatten().and_then(|t| t.attempt_bound()),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn attempt_bound_falls_back_to_read() {
        let timeout = Timeout {
            read: Some(Duration::from_secs(7)),
            ..Timeout::default()
        };
        assert_eq!(timeout.attempt_bound(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn merge_query_overlays_extra() {
        let options = RequestOptions::new()
            .with_query([("nickname", "Foo")])
            .merge_query(&Query::new().with("nickname", "Bar").with("limit", 5));

        assert_eq!(
            options.query.get("nickname"),
            Some(&Omittable::Value(QueryValue::text("Bar")))
        );
        assert_eq!(options.query.len(), 2);
    }

    #[test]
    fn post_parser_is_callable_and_debug_is_opaque() {
        let options = RequestOptions::new().with_post_parser(|body| body["id"].clone());
        let parser = options.post_parser.clone().expect("parser set");
        assert_eq!(parser(json!({"id": "abc"})), json!("abc"));
        assert!(format!("{options:?}").contains("<fn>"));
    }
}
