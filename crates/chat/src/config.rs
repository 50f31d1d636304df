use std::path::{Path, PathBuf};

use chatline_session::DEFAULT_SESSION_KEY;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize};
use snafu::ResultExt;

use super::error::{ConfigResult, ExtractSnafu};

pub const DEFAULT_ENDPOINT: &str = "/chat";
pub const DEFAULT_AGENT_NAME: &str = "mailworker";
pub const DEFAULT_USER_LABEL: &str = "You";
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "An error occurred while sending the message. Please check the console for details.";
pub const CONFIG_DIRECTORY_NAME: &str = "chatline";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_PREFIX: &str = "CHATLINE_";

/// Everything the controller needs to know about where and how to send.
///
/// Text fields also accept numbers and booleans, which is how `CHATLINE_*`
/// values such as `CHATLINE_AGENT_NAME=42` arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Path (or absolute URL) of the chat endpoint.
    #[serde(
        default = "default_endpoint",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub endpoint: String,
    /// Origin prepended to `endpoint` by hosts without a page origin.
    #[serde(default, deserialize_with = "deserialize_lenient_optional_string")]
    pub base_url: Option<String>,
    #[serde(
        default = "default_agent_name",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub agent_name: String,
    #[serde(
        default = "default_session_key",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub session_key: String,
    #[serde(
        default = "default_user_label",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub user_label: String,
    /// Text of the blocking notification shown when an exchange fails.
    #[serde(
        default = "default_failure_message",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub failure_message: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            base_url: None,
            agent_name: default_agent_name(),
            session_key: default_session_key(),
            user_label: default_user_label(),
            failure_message: default_failure_message(),
        }
    }
}

impl WidgetConfig {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(CONFIG_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".chatline"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
    }

    /// Loads defaults, then the default config file, then `CHATLINE_*` variables.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Same layering as [`WidgetConfig::load`] with an explicit file.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::debug!("config file not found at {:?}, using defaults", path);
        }

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract::<Self>()
            .map_err(Box::new)
            .context(ExtractSnafu {
                stage: "extract-widget-config",
                path: path.to_path_buf(),
            })?;

        Ok(config.normalized())
    }

    /// Trims every field and restores defaults for the blank ones.
    pub fn normalized(mut self) -> Self {
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.base_url = self
            .base_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        self.agent_name = non_blank_or(self.agent_name, default_agent_name);
        self.session_key = non_blank_or(self.session_key, default_session_key);
        self.user_label = non_blank_or(self.user_label, default_user_label);
        self.failure_message = non_blank_or(self.failure_message, default_failure_message);
        self
    }

    /// Where requests go: `endpoint` as is when absolute or when no base URL is set,
    /// otherwise `base_url` joined with `endpoint`.
    pub fn request_url(&self) -> String {
        if is_absolute_url(&self.endpoint) {
            return self.endpoint.clone();
        }

        match &self.base_url {
            Some(base_url) => format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.endpoint.trim_start_matches('/')
            ),
            None => self.endpoint.clone(),
        }
    }
}

fn is_absolute_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

/// A scalar read where text is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

impl ScalarText {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Unsigned(value) => value.to_string(),
            Self::Signed(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Flag(value) => value.to_string(),
        }
    }
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    ScalarText::deserialize(deserializer).map(ScalarText::into_string)
}

fn deserialize_lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ScalarText>::deserialize(deserializer).map(|value| value.map(ScalarText::into_string))
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

fn default_session_key() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

fn default_user_label() -> String {
    DEFAULT_USER_LABEL.to_string()
}

fn default_failure_message() -> String {
    DEFAULT_FAILURE_MESSAGE.to_string()
}
