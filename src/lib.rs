//! `nexon-openapi` is an HTTP client for the Nexon Open API.
//!
//! Every call goes through one request engine shared by the async
//! [`NexonClient`] and the thread-blocking [`blocking::NexonClient`]:
//! - default and per-call headers and query parameters are merged, with
//!   [`Omittable::Omit`] removing a key outright
//! - failed attempts are retried with capped exponential backoff, honoring
//!   `Retry-After` on retryable statuses
//! - non-success statuses map to typed [`NexonError`] variants
//! - successful bodies are decoded into the [`ResponseShape`] the caller asks for
//!
//! ```no_run
//! use nexon_openapi::{NexonClient, RequestOptions};
//!
//! # async fn run() -> nexon_openapi::Result<()> {
//! let client = NexonClient::from_env()?;
//! let ouid = client.fc_online().get_ouid("nickname", &RequestOptions::new()).await?;
//! let basic = client.fc_online().get_user_basic(&ouid, &RequestOptions::new()).await?;
//! println!("{} is level {}", basic.nickname, basic.level);
//! # Ok(())
//! # }
//! ```

pub mod blocking;
mod client;
mod config;
mod engine;
mod error;
mod options;
mod params;
mod resources;
mod response;
pub mod retry;
mod sentinel;
mod transport;
mod types;
mod value;

pub use client::NexonClient;
pub use config::{
    default_timeout, ClientConfig, ClientConfigBuilder, ConnectionLimits, API_KEY_ENV,
    API_KEY_HEADER, BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_IDEMPOTENCY_HEADER,
};
pub use error::{map_status_error, ApiStatusError, BoxError, NexonError, StatusErrorMapper};
pub use options::{PostParser, RequestOptions, Timeout};
pub use params::{merge_mappings, serialize_query, ArrayFormat, Headers, Query};
pub use resources::{FcOnline, FcOnlineBlocking};
pub use response::{unwrap_field, Json, ParseContext, Raw, ResponseShape, Text, UnknownJson};
pub use sentinel::{NotGivenOr, Omittable};
pub use transport::{
    AsyncTransport, PreparedRequest, RawResponse, ReqwestTransport, TransportFailure,
};
pub use types::{FcOnlineTrade, FcOnlineUserBasic, FcOnlineUserMaxDivision, TradeType};
pub use value::QueryValue;

pub type Result<T> = std::result::Result<T, NexonError>;
