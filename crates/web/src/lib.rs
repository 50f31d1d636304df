#![deny(unsafe_code)]

//! Browser binding for the chat widget.
//!
//! Load the module, then `new ChatWidget()` binds `#user-input` and `#chat-box`.
mod dom;
mod error;
mod fetch;
mod storage;
mod widget;

use chatline_session::{DEFAULT_SESSION_KEY, SessionIdentity};
use snafu::ResultExt;
use wasm_bindgen::prelude::*;

pub use dom::{AlertNotifier, DomInput, DomTranscript};
pub use error::{WidgetError, WidgetResult};
pub use fetch::FetchBackend;
pub use storage::BrowserSessionStore;
pub use widget::{ChatWidget, DEFAULT_INPUT_ID, DEFAULT_TRANSCRIPT_ID, WidgetOptions};

use crate::error::SessionSnafu;

/// Initialize WASM module
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("chatline widget module initialized");
}

/// A fresh `xxxx-xxxx-xxxx-xxxx` identifier; nothing is stored.
#[wasm_bindgen(js_name = generateSessionId)]
pub fn generate_session_id() -> String {
    chatline_session::generate_session_id()
}

/// The tab's session id, minted and stored on first use.
#[wasm_bindgen(js_name = getSessionId)]
pub fn get_session_id() -> Result<String, JsValue> {
    let id = SessionIdentity::with_key(BrowserSessionStore::new(), DEFAULT_SESSION_KEY)
        .get_session_id()
        .context(SessionSnafu {
            stage: "get-session-id",
        })?;

    Ok(id.into_string())
}
