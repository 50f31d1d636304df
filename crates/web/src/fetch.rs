use chatline::{ChatBackend, ExchangeError, ExchangeRequest, ExchangeResult, decode_body};
use futures::future::LocalBoxFuture;
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

use crate::error::js_details;

/// `window.fetch` transport. Relative URLs resolve against the page origin.
pub struct FetchBackend {
    url: String,
}

impl FetchBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, stage: &'static str, error: &JsValue) -> ExchangeError {
        ExchangeError::Transport {
            stage,
            endpoint: self.url.clone(),
            details: js_details(error),
        }
    }

    async fn post(&self, request: &ExchangeRequest) -> ExchangeResult<Value> {
        let body = request.to_json()?;
        let window = web_sys::window().ok_or_else(|| ExchangeError::Transport {
            stage: "resolve-window",
            endpoint: self.url.clone(),
            details: "no window".to_string(),
        })?;

        let headers =
            Headers::new().map_err(|error| self.transport_error("build-headers", &error))?;
        headers
            .set("Content-Type", "application/json")
            .map_err(|error| self.transport_error("build-headers", &error))?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));

        let request = Request::new_with_str_and_init(&self.url, &init)
            .map_err(|error| self.transport_error("build-chat-request", &error))?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|error| self.transport_error("send-chat-request", &error))?;
        let response: Response = response
            .dyn_into()
            .map_err(|error| self.transport_error("send-chat-request", &error))?;

        if !response.ok() {
            tracing::warn!(
                status = response.status(),
                url = %self.url,
                "chat endpoint answered with a non-success status"
            );
        }

        let text = response
            .text()
            .map_err(|error| self.transport_error("read-chat-response", &error))?;
        let text = JsFuture::from(text)
            .await
            .map_err(|error| self.transport_error("read-chat-response", &error))?;
        let text = text.as_string().unwrap_or_default();

        decode_body(&text)
    }
}

impl ChatBackend for FetchBackend {
    fn post_chat<'a>(
        &'a self,
        request: &'a ExchangeRequest,
    ) -> LocalBoxFuture<'a, ExchangeResult<Value>> {
        Box::pin(self.post(request))
    }
}
