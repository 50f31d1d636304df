use chatline_session::SessionError;
use snafu::Snafu;
use wasm_bindgen::JsValue;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WidgetError {
    #[snafu(display("no browser window available on `{stage}`"))]
    NoWindow { stage: &'static str },
    #[snafu(display("window has no document on `{stage}`"))]
    NoDocument { stage: &'static str },
    #[snafu(display("element '{selector}' not found on `{stage}`"))]
    MissingElement {
        stage: &'static str,
        selector: String,
    },
    #[snafu(display("element '{selector}' is not a text input on `{stage}`"))]
    NotAnInput {
        stage: &'static str,
        selector: String,
    },
    #[snafu(display("invalid widget options on `{stage}`: {details}"))]
    Options {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("DOM call failed on `{stage}`: {details}"))]
    Dom {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("session id unavailable on `{stage}`: {source}"))]
    Session {
        stage: &'static str,
        source: SessionError,
    },
}

pub type WidgetResult<T> = Result<T, WidgetError>;

impl From<WidgetError> for JsValue {
    fn from(error: WidgetError) -> Self {
        js_sys::Error::new(&error.to_string()).into()
    }
}

/// Debug rendering of a thrown JS value, the only detail it reliably carries.
pub(crate) fn js_details(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}
