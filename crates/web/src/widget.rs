use std::rc::Rc;

use chatline::{
    ChatController, ChatSurface, CommonMarkRenderer, PendingExchange, WidgetConfig,
};
use serde::Deserialize;
use snafu::ResultExt;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlInputElement, KeyboardEvent};

use crate::dom::{AlertNotifier, DomInput, DomTranscript, document, find_element};
use crate::error::{
    DomSnafu, NoWindowSnafu, OptionsSnafu, SessionSnafu, WidgetResult, js_details,
};
use crate::fetch::FetchBackend;
use crate::storage::BrowserSessionStore;

pub const DEFAULT_INPUT_ID: &str = "user-input";
pub const DEFAULT_TRANSCRIPT_ID: &str = "chat-box";

/// Page bindings plus controller settings, as passed from JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetOptions {
    pub input_id: String,
    pub transcript_id: String,
    #[serde(flatten)]
    pub config: WidgetConfig,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            input_id: DEFAULT_INPUT_ID.to_string(),
            transcript_id: DEFAULT_TRANSCRIPT_ID.to_string(),
            config: WidgetConfig::default(),
        }
    }
}

type KeyListener = Closure<dyn FnMut(KeyboardEvent)>;

/// A chat widget bound to one input field and one transcript container.
///
/// Dropping it (`free()` from JavaScript) detaches the key handler.
#[wasm_bindgen]
pub struct ChatWidget {
    controller: Rc<ChatController>,
    input: HtmlInputElement,
    on_keypress: KeyListener,
}

#[wasm_bindgen]
impl ChatWidget {
    /// Binds to `#user-input` and `#chat-box` with default settings.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<ChatWidget, JsValue> {
        Ok(Self::mount(WidgetOptions::default())?)
    }

    /// Binds using a plain options object, e.g. `{ agent_name: "support" }`.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(options: JsValue) -> Result<ChatWidget, JsValue> {
        let options = if options.is_undefined() || options.is_null() {
            WidgetOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(|source| {
                OptionsSnafu {
                    stage: "parse-widget-options",
                    details: source.to_string(),
                }
                .build()
            })?
        };

        Ok(Self::mount(options)?)
    }

    /// Sends the current input; a no-op when it is empty.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self) {
        if let Some(pending) = self.controller.send_message() {
            dispatch(pending);
        }
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> Result<String, JsValue> {
        let id = self.controller.session_id().context(SessionSnafu {
            stage: "read-session-id",
        })?;
        Ok(id.into_string())
    }

    #[wasm_bindgen(js_name = resetSession)]
    pub fn reset_session(&self) -> Result<(), JsValue> {
        self.controller.reset_session().context(SessionSnafu {
            stage: "reset-session-id",
        })?;
        Ok(())
    }

    /// Exchanges still waiting for the endpoint.
    #[wasm_bindgen(js_name = inFlight)]
    pub fn in_flight(&self) -> usize {
        self.controller.in_flight()
    }
}

impl ChatWidget {
    pub fn mount(options: WidgetOptions) -> WidgetResult<Self> {
        let window = web_sys::window().ok_or_else(|| {
            NoWindowSnafu {
                stage: "mount-widget",
            }
            .build()
        })?;
        let document = document(&window)?;

        let input = DomInput::find(&document, &options.input_id)?;
        let input_element = input.element().clone();
        let container = find_element(&document, &options.transcript_id)?;

        let config = options.config.normalized();
        let backend = FetchBackend::new(config.request_url());
        tracing::info!(
            endpoint = backend.url(),
            agent = %config.agent_name,
            "mounting chat widget"
        );

        let controller = Rc::new(ChatController::new(
            config,
            Rc::new(BrowserSessionStore::new()),
            ChatSurface {
                input: Rc::new(input),
                view: Rc::new(DomTranscript::new(document, container)),
                notifier: Rc::new(AlertNotifier::new(window)),
            },
            Rc::new(backend),
            Rc::new(CommonMarkRenderer::default()),
        ));

        let on_keypress = {
            let controller = Rc::clone(&controller);
            KeyListener::new(move |event: KeyboardEvent| {
                let outcome = controller.on_key_press(&event.key());
                if outcome.prevents_default() {
                    event.prevent_default();
                }
                if let Some(pending) = outcome.into_pending() {
                    dispatch(pending);
                }
            })
        };
        input_element
            .add_event_listener_with_callback("keypress", on_keypress.as_ref().unchecked_ref())
            .map_err(|error| {
                DomSnafu {
                    stage: "attach-key-listener",
                    details: js_details(&error),
                }
                .build()
            })?;

        controller.on_load();

        Ok(Self {
            controller,
            input: input_element,
            on_keypress,
        })
    }
}

impl Drop for ChatWidget {
    fn drop(&mut self) {
        let detached = self.input.remove_event_listener_with_callback(
            "keypress",
            self.on_keypress.as_ref().unchecked_ref(),
        );
        if let Err(error) = detached {
            tracing::warn!(details = %js_details(&error), "failed to detach key listener");
        }
    }
}

/// Runs an exchange on the browser event loop. Failures were already reported.
fn dispatch(pending: PendingExchange) {
    let id = pending.id();
    wasm_bindgen_futures::spawn_local(async move {
        if pending.run().await.is_ok() {
            tracing::debug!(exchange = %id, "exchange delivered");
        }
    });
}
