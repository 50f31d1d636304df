use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::error::ExchangeResult;
use crate::exchange::ExchangeRequest;

#[cfg(not(target_arch = "wasm32"))]
mod http;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpBackend;

/// Transport for the single `POST /chat` round trip.
///
/// Implementations resolve to the parsed JSON body. HTTP status is not
/// interpreted: error bodies are still replies worth showing.
pub trait ChatBackend {
    fn post_chat<'a>(
        &'a self,
        request: &'a ExchangeRequest,
    ) -> LocalBoxFuture<'a, ExchangeResult<Value>>;
}
