//! Typed endpoint groups layered on the generic request methods.

mod fc_online;

pub use fc_online::{FcOnline, FcOnlineBlocking};

use crate::{Query, RequestOptions};

/// Starts from the endpoint's own query and lets the caller's query override
/// or omit individual keys.
fn endpoint_options(query: Query, options: &RequestOptions) -> RequestOptions {
    RequestOptions {
        query,
        ..options.clone()
    }
    .merge_query(&options.query)
}
