use std::error::Error as StdError;

use reqwest::{header::HeaderMap, Method};
use serde_json::Value as JsonValue;

/// Boxed error raised by a transport.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Maps a non-success response onto the error kind returned to the caller.
pub type StatusErrorMapper = fn(ApiStatusError) -> NexonError;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum NexonError {
    /// Missing or invalid client configuration, raised before any network activity.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The request could not be built from the given options.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The server could not be reached after exhausting retries.
    #[error("connection error: {method} {url}")]
    Connection {
        method: Method,
        url: String,
        #[source]
        source: BoxError,
    },
    /// The last attempt did not complete within its timeout.
    #[error("request timed out: {method} {url}")]
    Timeout {
        method: Method,
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("bad request: {0}")]
    BadRequest(ApiStatusError),
    #[error("authentication error: {0}")]
    Authentication(ApiStatusError),
    #[error("permission denied: {0}")]
    PermissionDenied(ApiStatusError),
    #[error("not found: {0}")]
    NotFound(ApiStatusError),
    #[error("conflict: {0}")]
    Conflict(ApiStatusError),
    #[error("unprocessable entity: {0}")]
    UnprocessableEntity(ApiStatusError),
    #[error("rate limited: {0}")]
    RateLimit(ApiStatusError),
    #[error("internal server error: {0}")]
    InternalServer(ApiStatusError),
    /// Any other non-success status.
    #[error("http status error: {0}")]
    Status(ApiStatusError),
    /// A successful response did not match the expected shape.
    #[error("response validation error for {url}: {message}")]
    Validation {
        url: String,
        message: String,
        body: String,
    },
    /// The client was closed before this call.
    #[error("client is closed")]
    Closed,
}

impl NexonError {
    /// Returns the status error payload for any status-derived kind.
    pub fn status_error(&self) -> Option<&ApiStatusError> {
        match self {
            Self::BadRequest(err)
            | Self::Authentication(err)
            | Self::PermissionDenied(err)
            | Self::NotFound(err)
            | Self::Conflict(err)
            | Self::UnprocessableEntity(err)
            | Self::RateLimit(err)
            | Self::InternalServer(err)
            | Self::Status(err) => Some(err),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.status_error().map(|err| err.status)
    }
}

/// Non-success HTTP response, with the parsed error body when there is one.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message} ({method} {url})")]
pub struct ApiStatusError {
    pub message: String,
    pub status: u16,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// JSON body with any `{"error": ...}` envelope removed. Non-JSON bodies
    /// are kept as a JSON string.
    pub body: Option<JsonValue>,
}

impl ApiStatusError {
    pub(crate) fn from_response(
        method: Method,
        url: String,
        status: u16,
        headers: HeaderMap,
        raw: &[u8],
    ) -> Self {
        let text = String::from_utf8_lossy(raw).trim().to_owned();
        let (body, message) = if text.is_empty() {
            (None, format!("Error code: {status}"))
        } else {
            match serde_json::from_str::<JsonValue>(&text) {
                Ok(parsed) => {
                    let message = format!("Error code: {status} - {parsed}");
                    (Some(unwrap_error_envelope(parsed)), message)
                }
                Err(_) => (Some(JsonValue::String(text.clone())), text),
            }
        };

        Self {
            message,
            status,
            method,
            url,
            headers,
            body,
        }
    }

    /// Error code reported by the API, e.g. `OPENAPI00004`.
    pub fn error_name(&self) -> Option<&str> {
        self.body.as_ref()?.get("name")?.as_str()
    }

    /// Human readable error description reported by the API.
    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("message")?.as_str()
    }
}

fn unwrap_error_envelope(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Object(mut map) if map.contains_key("error") => {
            map.remove("error").unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

/// Default [`StatusErrorMapper`].
pub fn map_status_error(err: ApiStatusError) -> NexonError {
    match err.status {
        400 => NexonError::BadRequest(err),
        401 => NexonError::Authentication(err),
        403 => NexonError::PermissionDenied(err),
        404 => NexonError::NotFound(err),
        409 => NexonError::Conflict(err),
        422 => NexonError::UnprocessableEntity(err),
        429 => NexonError::RateLimit(err),
        status if status >= 500 => NexonError::InternalServer(err),
        _ => NexonError::Status(err),
    }
}
