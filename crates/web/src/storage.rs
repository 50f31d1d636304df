use chatline_session::{SessionError, SessionResult, SessionStore};
use wasm_bindgen::JsValue;
use web_sys::Storage;

use crate::error::js_details;

/// `window.sessionStorage`: per tab, cleared when the tab closes.
///
/// The storage object is looked up on every call, so a page where it is missing
/// or blocked still mounts and each exchange fails on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSessionStore;

impl BrowserSessionStore {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self, stage: &'static str, key: &str) -> SessionResult<Storage> {
        let unavailable = |details: String| SessionError::Storage {
            stage,
            key: key.to_string(),
            details,
        };

        web_sys::window()
            .ok_or_else(|| unavailable("no window".to_string()))?
            .session_storage()
            .map_err(|error| unavailable(js_details(&error)))?
            .ok_or_else(|| unavailable("sessionStorage is disabled".to_string()))
    }
}

fn storage_error(stage: &'static str, key: &str, error: JsValue) -> SessionError {
    SessionError::Storage {
        stage,
        key: key.to_string(),
        details: js_details(&error),
    }
}

impl SessionStore for BrowserSessionStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let stage = "read-session-storage";
        self.storage(stage, key)?
            .get_item(key)
            .map_err(|error| storage_error(stage, key, error))
    }

    fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        let stage = "write-session-storage";
        self.storage(stage, key)?
            .set_item(key, value)
            .map_err(|error| storage_error(stage, key, error))
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        let stage = "clear-session-storage";
        self.storage(stage, key)?
            .remove_item(key)
            .map_err(|error| storage_error(stage, key, error))
    }
}
