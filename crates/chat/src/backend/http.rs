use futures::future::LocalBoxFuture;
use reqwest::{Client, Url};
use serde_json::Value;

use super::ChatBackend;
use crate::config::WidgetConfig;
use crate::error::{
    ConfigResult, ExchangeError, ExchangeResult, HttpClientSnafu, InvalidUrlSnafu,
};
use crate::exchange::{ExchangeRequest, decode_body};

/// Native transport built on `reqwest`; needs an absolute endpoint URL.
pub struct HttpBackend {
    client: Client,
    url: Url,
}

impl HttpBackend {
    pub fn new(url: &str) -> ConfigResult<Self> {
        let url = Url::parse(url).map_err(|source| {
            InvalidUrlSnafu {
                stage: "parse-chat-url",
                url: url.to_string(),
                details: source.to_string(),
            }
            .build()
        })?;

        let client = Client::builder().build().map_err(|source| {
            HttpClientSnafu {
                stage: "build-http-client",
                details: source.to_string(),
            }
            .build()
        })?;

        Ok(Self { client, url })
    }

    pub fn from_config(config: &WidgetConfig) -> ConfigResult<Self> {
        Self::new(&config.request_url())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn transport_error(&self, stage: &'static str, source: reqwest::Error) -> ExchangeError {
        ExchangeError::Transport {
            stage,
            endpoint: self.url.to_string(),
            details: source.to_string(),
        }
    }
}

impl ChatBackend for HttpBackend {
    fn post_chat<'a>(
        &'a self,
        request: &'a ExchangeRequest,
    ) -> LocalBoxFuture<'a, ExchangeResult<Value>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url.clone())
                .json(request)
                .send()
                .await
                .map_err(|source| self.transport_error("send-chat-request", source))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|source| self.transport_error("read-chat-response", source))?;

            if !status.is_success() {
                tracing::warn!(
                    status = status.as_u16(),
                    url = %self.url,
                    "chat endpoint answered with a non-success status"
                );
            }

            decode_body(&body)
        })
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpBackend")
            .field("url", &self.url.as_str())
            .finish()
    }
}
