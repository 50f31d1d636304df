use std::path::PathBuf;

use chatline_session::SessionError;
use snafu::Snafu;

/// Why one exchange ended without a reply.
///
/// Transport and decode failures are handled identically by the controller but
/// stay distinguishable for callers that care.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExchangeError {
    #[snafu(display("could not resolve the session id on `{stage}`: {source}"))]
    Session {
        stage: &'static str,
        source: SessionError,
    },
    #[snafu(display("failed to encode chat request on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`: {details}"))]
    Transport {
        stage: &'static str,
        endpoint: String,
        details: String,
    },
    #[snafu(display("chat response is not valid JSON on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        source: serde_json::Error,
    },
}

impl ExchangeError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Session { stage, .. }
            | Self::Encode { stage, .. }
            | Self::Transport { stage, .. }
            | Self::Decode { stage, .. } => stage,
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        source: Box<figment::Error>,
    },
    #[snafu(display("chat endpoint '{url}' is not an absolute URL on `{stage}`: {details}"))]
    InvalidUrl {
        stage: &'static str,
        url: String,
        details: String,
    },
    #[snafu(display("failed to build HTTP client on `{stage}`: {details}"))]
    HttpClient {
        stage: &'static str,
        details: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
