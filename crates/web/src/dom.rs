use chatline::{
    EntryBody, EntryRole, InputField, Notifier, ScrollMetrics, TranscriptEntry, TranscriptView,
};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlInputElement, Window};

use crate::error::{
    DomSnafu, MissingElementSnafu, NoDocumentSnafu, NotAnInputSnafu, WidgetResult, js_details,
};

pub(crate) fn document(window: &Window) -> WidgetResult<Document> {
    window.document().ok_or_else(|| {
        NoDocumentSnafu {
            stage: "resolve-document",
        }
        .build()
    })
}

/// Looks up `#id`, then `.id` for pages that only mark the container by class.
pub(crate) fn find_element(document: &Document, id: &str) -> WidgetResult<Element> {
    if let Some(element) = document.get_element_by_id(id) {
        return Ok(element);
    }

    let selector = format!(".{id}");
    document
        .query_selector(&selector)
        .map_err(|error| {
            DomSnafu {
                stage: "query-element",
                details: js_details(&error),
            }
            .build()
        })?
        .ok_or_else(|| {
            MissingElementSnafu {
                stage: "query-element",
                selector: format!("#{id}"),
            }
            .build()
        })
}

/// The text field the user types into.
pub struct DomInput {
    element: HtmlInputElement,
}

impl DomInput {
    pub fn find(document: &Document, id: &str) -> WidgetResult<Self> {
        let element = document
            .get_element_by_id(id)
            .ok_or_else(|| {
                MissingElementSnafu {
                    stage: "find-input",
                    selector: format!("#{id}"),
                }
                .build()
            })?
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| {
                NotAnInputSnafu {
                    stage: "find-input",
                    selector: format!("#{id}"),
                }
                .build()
            })?;

        Ok(Self { element })
    }

    pub fn element(&self) -> &HtmlInputElement {
        &self.element
    }
}

impl InputField for DomInput {
    fn value(&self) -> String {
        self.element.value()
    }

    fn clear(&self) {
        self.element.set_value("");
    }
}

/// Scrollable container that transcript entries are appended to.
pub struct DomTranscript {
    document: Document,
    container: Element,
}

impl DomTranscript {
    pub fn new(document: Document, container: Element) -> Self {
        Self {
            document,
            container,
        }
    }

    fn build_node(&self, entry: &TranscriptEntry) -> WidgetResult<Element> {
        let create = |tag: &str| {
            self.document.create_element(tag).map_err(|error| {
                DomSnafu {
                    stage: "create-entry",
                    details: js_details(&error),
                }
                .build()
            })
        };

        let node = match entry.role {
            EntryRole::Spacer => create("br")?,
            EntryRole::User => {
                let node = create("div")?;
                node.set_class_name("message user-message");
                node
            }
            EntryRole::Bot => {
                let node = create("div")?;
                node.set_class_name("message bot-message");
                node
            }
        };

        match &entry.body {
            EntryBody::Text(text) => node.set_text_content(Some(text.as_str())),
            EntryBody::Markup(markup) => node.set_inner_html(markup),
            EntryBody::Empty => {}
        }
        Ok(node)
    }
}

impl TranscriptView for DomTranscript {
    fn render_entry(&self, entry: &TranscriptEntry) {
        let appended = self.build_node(entry).and_then(|node| {
            self.container.append_child(&node).map_err(|error| {
                DomSnafu {
                    stage: "append-entry",
                    details: js_details(&error),
                }
                .build()
            })
        });

        if let Err(error) = appended {
            tracing::warn!(entry = entry.id.0, %error, "failed to render transcript entry");
        }
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: f64::from(self.container.scroll_top()),
            scroll_height: f64::from(self.container.scroll_height()),
            client_height: f64::from(self.container.client_height()),
        }
    }

    fn set_scroll_top(&self, offset: f64) {
        self.container.set_scroll_top(offset.round() as i32);
    }
}

/// Blocking `window.alert`, the only failure notification a user sees.
pub struct AlertNotifier {
    window: Window,
}

impl AlertNotifier {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Notifier for AlertNotifier {
    fn notify_failure(&self, message: &str) {
        if let Err(error) = self.window.alert_with_message(message) {
            tracing::warn!(details = %js_details(&error), "alert could not be shown");
        }
    }
}
