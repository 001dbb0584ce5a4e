//! Turning a successful response body into the caller's result type.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{transport::RawResponse, NexonError, PostParser, Result};

/// Per-call inputs for parsing a successful response.
pub struct ParseContext<'a> {
    pub url: &'a str,
    /// Reject bodies that do not decode into the requested type as is.
    pub strict: bool,
    pub post_parser: Option<&'a PostParser>,
}

impl ParseContext<'_> {
    fn validation_error(&self, message: String, body: &[u8]) -> NexonError {
        NexonError::Validation {
            url: self.url.to_owned(),
            message,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// Expected shape of a successful response.
pub trait ResponseShape {
    type Output;

    fn parse(response: RawResponse, ctx: &ParseContext<'_>) -> Result<Self::Output>;
}

/// JSON body decoded into `T`: a record, a `Vec` of records, or an opaque
/// [`serde_json::Value`].
pub struct Json<T>(PhantomData<fn() -> T>);

/// Opaque JSON of unknown schema.
pub type UnknownJson = Json<JsonValue>;

/// Body as text.
pub struct Text;

/// Body as raw bytes.
pub struct Raw;

impl<T: DeserializeOwned> ResponseShape for Json<T> {
    type Output = T;

    fn parse(response: RawResponse, ctx: &ParseContext<'_>) -> Result<T> {
        let value = if response.body.iter().all(u8::is_ascii_whitespace) {
            JsonValue::Null
        } else {
            serde_json::from_slice::<JsonValue>(&response.body).map_err(|err| {
                ctx.validation_error(format!("response body is not JSON: {err}"), &response.body)
            })?
        };
        let value = match ctx.post_parser {
            Some(parser) => parser(value),
            None => value,
        };

        decode_value(value, ctx).map_err(|err| ctx.validation_error(err, &response.body))
    }
}

impl ResponseShape for Text {
    type Output = String;

    fn parse(response: RawResponse, _ctx: &ParseContext<'_>) -> Result<String> {
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }
}

impl ResponseShape for Raw {
    type Output = Bytes;

    fn parse(response: RawResponse, _ctx: &ParseContext<'_>) -> Result<Bytes> {
        Ok(response.body)
    }
}

fn decode_value<T: DeserializeOwned>(value: JsonValue, ctx: &ParseContext<'_>) -> std::result::Result<T, String> {
    match T::deserialize(&value) {
        Ok(decoded) => Ok(decoded),
        Err(err) if ctx.strict => Err(err.to_string()),
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(url = ctx.url, error = %err, "strict decode failed, retrying without null members");

            serde_json::from_value(strip_nulls(value)).map_err(|_| err.to_string())
        }
    }
}

/// Removes `null` object members so optional and defaulted fields absorb them.
fn strip_nulls(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .filter(|(_, member)| !member.is_null())
                .map(|(key, member)| (key, strip_nulls(member)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Unwraps a single field of a JSON object, e.g. `{"ouid": "..."}` to `"..."`.
///
/// Meant for use as a post-parser.
pub fn unwrap_field(field: &'static str) -> impl Fn(JsonValue) -> JsonValue + Send + Sync {
    move |value| match value {
        JsonValue::Object(mut map) => map.remove(field).unwrap_or(JsonValue::Null),
        other => other,
    }
}
