use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chatline_session::{SessionId, SessionIdentity, SessionResult, SessionStore};
use serde_json::Value;
use snafu::ResultExt;

use crate::backend::ChatBackend;
use crate::config::WidgetConfig;
use crate::error::{ExchangeError, ExchangeResult, SessionSnafu};
use crate::exchange::{ExchangeReply, ExchangeRequest, extract_reply_text};
use crate::input::{InputField, is_submit_key};
use crate::markdown::MarkdownRenderer;
use crate::notify::Notifier;
use crate::tracker::{ExchangeId, ExchangeState, ExchangeTracker, ExchangeTransition};
use crate::transcript::{Transcript, TranscriptView};

/// Host-side widgets the controller reads from and writes to.
pub struct ChatSurface {
    pub input: Rc<dyn InputField>,
    pub view: Rc<dyn TranscriptView>,
    pub notifier: Rc<dyn Notifier>,
}

/// State shared between the controller and its in-flight exchanges.
struct Shared {
    config: WidgetConfig,
    identity: SessionIdentity<Rc<dyn SessionStore>>,
    notifier: Rc<dyn Notifier>,
    backend: Rc<dyn ChatBackend>,
    renderer: Rc<dyn MarkdownRenderer>,
    transcript: RefCell<Transcript>,
    exchanges: RefCell<ExchangeTracker>,
}

/// Reads the input, keeps the transcript and runs one exchange per send.
///
/// Sends are not serialized: each returns its own [`PendingExchange`], and
/// replies land in the transcript in completion order.
pub struct ChatController {
    input: Rc<dyn InputField>,
    shared: Rc<Shared>,
}

/// Result of a key press on the input field.
pub enum KeyOutcome {
    /// The submit key was pressed; the host suppresses its default action.
    Submitted(Option<PendingExchange>),
    Ignored,
}

impl KeyOutcome {
    pub fn prevents_default(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }

    pub fn into_pending(self) -> Option<PendingExchange> {
        match self {
            Self::Submitted(pending) => pending,
            Self::Ignored => None,
        }
    }
}

impl ChatController {
    pub fn new(
        config: WidgetConfig,
        session_store: Rc<dyn SessionStore>,
        surface: ChatSurface,
        backend: Rc<dyn ChatBackend>,
        renderer: Rc<dyn MarkdownRenderer>,
    ) -> Self {
        let config = config.normalized();
        let identity = SessionIdentity::with_key(session_store, config.session_key.clone());

        Self {
            input: surface.input,
            shared: Rc::new(Shared {
                config,
                identity,
                notifier: surface.notifier,
                backend,
                renderer,
                transcript: RefCell::new(Transcript::new(surface.view)),
                exchanges: RefCell::new(ExchangeTracker::new()),
            }),
        }
    }

    /// Echoes the input into the transcript, clears it and prepares the exchange.
    ///
    /// Empty or whitespace-only input is ignored and returns `None`. Nothing is
    /// sent until the returned exchange is run.
    pub fn send_message(&self) -> Option<PendingExchange> {
        let input = self.input.value();
        if input.trim().is_empty() {
            tracing::trace!("ignoring send with empty input");
            return None;
        }

        let id = self.shared.exchanges.borrow_mut().begin();
        self.shared.transcript.borrow_mut().append_user(
            &self.shared.config.user_label,
            &input,
            Some(id),
        );
        self.input.clear();

        tracing::debug!(exchange = %id, "exchange started");
        Some(PendingExchange {
            id,
            input,
            shared: Rc::clone(&self.shared),
        })
    }

    /// Submits on Enter; every other key is left to the host.
    pub fn on_key_press(&self, key: &str) -> KeyOutcome {
        if is_submit_key(key) {
            KeyOutcome::Submitted(self.send_message())
        } else {
            KeyOutcome::Ignored
        }
    }

    /// Brings pre-rendered entries into view when the surface first loads.
    pub fn on_load(&self) {
        self.shared.transcript.borrow_mut().scroll_to_bottom();
    }

    pub fn session_id(&self) -> SessionResult<SessionId> {
        self.shared.identity.get_session_id()
    }

    pub fn reset_session(&self) -> SessionResult<()> {
        self.shared.identity.reset()
    }

    pub fn transcript(&self) -> Ref<'_, Transcript> {
        self.shared.transcript.borrow()
    }

    pub fn exchange_state(&self, id: ExchangeId) -> Option<ExchangeState> {
        self.shared.exchanges.borrow().state(id).cloned()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.exchanges.borrow().in_flight()
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.shared.config
    }
}

/// One exchange whose user entry is already in the transcript.
///
/// Dropping it without running leaves the exchange awaiting forever.
pub struct PendingExchange {
    id: ExchangeId,
    input: String,
    shared: Rc<Shared>,
}

impl PendingExchange {
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Sends the request and appends the rendered reply, or reports the failure.
    ///
    /// Failures have already been shown to the user and logged when this returns.
    pub async fn run(self) -> ExchangeResult<ExchangeReply> {
        match self.round_trip().await {
            Ok(body) => Ok(self.deliver(&body)),
            Err(error) => Err(self.fail(error)),
        }
    }

    async fn round_trip(&self) -> ExchangeResult<Value> {
        let session_id = self
            .shared
            .identity
            .get_session_id()
            .context(SessionSnafu {
                stage: "resolve-session-id",
            })?;
        let request = ExchangeRequest::new(&self.shared.config.agent_name, &self.input, &session_id);

        self.shared.backend.post_chat(&request).await
    }

    fn deliver(&self, body: &Value) -> ExchangeReply {
        tracing::info!(exchange = %self.id, response = %body, "agent response");

        let text = extract_reply_text(body);
        let markup = self.shared.renderer.render(&text);
        {
            let mut transcript = self.shared.transcript.borrow_mut();
            transcript.append_bot(markup.clone(), Some(self.id));
            transcript.append_spacer(Some(self.id));
            transcript.scroll_to_bottom();
        }

        self.settle(ExchangeTransition::Deliver(self.id));
        ExchangeReply {
            exchange: self.id,
            text,
            markup,
        }
    }

    fn fail(&self, error: ExchangeError) -> ExchangeError {
        tracing::error!(
            exchange = %self.id,
            stage = error.stage(),
            error = %error,
            "chat exchange failed"
        );
        self.shared
            .notifier
            .notify_failure(&self.shared.config.failure_message);

        self.settle(ExchangeTransition::Fail {
            id: self.id,
            message: error.to_string(),
        });
        error
    }

    fn settle(&self, transition: ExchangeTransition) {
        if let Err(rejection) = self.shared.exchanges.borrow_mut().apply(transition) {
            tracing::warn!(exchange = %self.id, ?rejection, "exchange settled twice");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;

    use chatline_session::{MemorySessionStore, SessionError, is_canonical};
    use futures::channel::oneshot;
    use futures::future::LocalBoxFuture;
    use serde_json::json;

    use super::*;
    use crate::exchange::decode_body;
    use crate::markdown::CommonMarkRenderer;
    use crate::transcript::{EntryBody, EntryRole, ScrollMetrics, TranscriptEntry};

    #[derive(Default)]
    struct TestInput {
        value: RefCell<String>,
    }

    impl TestInput {
        fn type_text(&self, text: &str) {
            *self.value.borrow_mut() = text.to_string();
        }
    }

    impl InputField for TestInput {
        fn value(&self) -> String {
            self.value.borrow().clone()
        }

        fn clear(&self) {
            self.value.borrow_mut().clear();
        }
    }

    #[derive(Default)]
    struct RecordingView {
        rendered: RefCell<Vec<TranscriptEntry>>,
        scroll_top: Cell<Option<f64>>,
    }

    impl TranscriptView for RecordingView {
        fn render_entry(&self, entry: &TranscriptEntry) {
            self.rendered.borrow_mut().push(entry.clone());
        }

        fn scroll_metrics(&self) -> ScrollMetrics {
            ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: 480.0,
                client_height: 200.0,
            }
        }

        fn set_scroll_top(&self, offset: f64) {
            self.scroll_top.set(Some(offset));
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        messages: RefCell<Vec<String>>,
    }

    impl Notifier for CountingNotifier {
        fn notify_failure(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    /// Answers requests from a queue of canned results.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: RefCell<VecDeque<ExchangeResult<Value>>>,
        requests: RefCell<Vec<ExchangeRequest>>,
    }

    impl ScriptedBackend {
        fn reply(&self, result: ExchangeResult<Value>) {
            self.replies.borrow_mut().push_back(result);
        }
    }

    impl ChatBackend for ScriptedBackend {
        fn post_chat<'a>(
            &'a self,
            request: &'a ExchangeRequest,
        ) -> LocalBoxFuture<'a, ExchangeResult<Value>> {
            self.requests.borrow_mut().push(request.clone());
            let next = self.replies.borrow_mut().pop_front();
            Box::pin(async move {
                next.unwrap_or_else(|| {
                    Err(ExchangeError::Transport {
                        stage: "scripted-backend",
                        endpoint: "/chat".to_string(),
                        details: "no reply scripted".to_string(),
                    })
                })
            })
        }
    }

    /// Holds every request until the test releases it.
    #[derive(Default)]
    struct GatedBackend {
        gates: RefCell<Vec<Option<oneshot::Sender<Value>>>>,
    }

    impl GatedBackend {
        fn release(&self, index: usize, body: Value) {
            let sender = self.gates.borrow_mut()[index].take().unwrap();
            sender.send(body).unwrap();
        }
    }

    impl ChatBackend for GatedBackend {
        fn post_chat<'a>(
            &'a self,
            _request: &'a ExchangeRequest,
        ) -> LocalBoxFuture<'a, ExchangeResult<Value>> {
            let (sender, receiver) = oneshot::channel();
            self.gates.borrow_mut().push(Some(sender));
            Box::pin(async move {
                receiver.await.map_err(|_| ExchangeError::Transport {
                    stage: "gated-backend",
                    endpoint: "/chat".to_string(),
                    details: "gate dropped".to_string(),
                })
            })
        }
    }

    /// Session storage that refuses every call until it is unblocked.
    struct BlockableStore {
        blocked: Cell<bool>,
        inner: MemorySessionStore,
    }

    impl BlockableStore {
        fn blocked() -> Self {
            Self {
                blocked: Cell::new(true),
                inner: MemorySessionStore::new(),
            }
        }

        fn unblock(&self) {
            self.blocked.set(false);
        }

        fn check(&self, key: &str) -> SessionResult<()> {
            if self.blocked.get() {
                return Err(SessionError::Storage {
                    stage: "blockable-store",
                    key: key.to_string(),
                    details: "storage disabled".to_string(),
                });
            }
            Ok(())
        }
    }

    impl SessionStore for BlockableStore {
        fn get(&self, key: &str) -> SessionResult<Option<String>> {
            self.check(key)?;
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> SessionResult<()> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> SessionResult<()> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    struct Harness<B> {
        input: Rc<TestInput>,
        view: Rc<RecordingView>,
        notifier: Rc<CountingNotifier>,
        backend: Rc<B>,
        controller: ChatController,
    }

    fn harness<B>(backend: B, store: Rc<dyn SessionStore>) -> Harness<B>
    where
        B: ChatBackend + 'static,
    {
        let input = Rc::new(TestInput::default());
        let view = Rc::new(RecordingView::default());
        let notifier = Rc::new(CountingNotifier::default());
        let backend = Rc::new(backend);

        let controller = ChatController::new(
            WidgetConfig::default(),
            store,
            ChatSurface {
                input: input.clone(),
                view: view.clone(),
                notifier: notifier.clone(),
            },
            backend.clone(),
            Rc::new(CommonMarkRenderer::default()),
        );

        Harness {
            input,
            view,
            notifier,
            backend,
            controller,
        }
    }

    fn scripted() -> Harness<ScriptedBackend> {
        harness(ScriptedBackend::default(), Rc::new(MemorySessionStore::new()))
    }

    #[test]
    fn empty_input_changes_nothing() {
        let h = scripted();

        for text in ["", "   ", "\t\n"] {
            h.input.type_text(text);
            assert!(h.controller.send_message().is_none());
            assert_eq!(h.input.value(), text);
        }

        assert!(h.controller.transcript().is_empty());
        assert!(h.view.rendered.borrow().is_empty());
        assert!(h.backend.requests.borrow().is_empty());
        assert_eq!(h.controller.in_flight(), 0);
    }

    #[test]
    fn user_entry_is_appended_before_any_response() {
        let h = scripted();
        h.input.type_text("hello");

        let pending = h.controller.send_message().unwrap();

        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        let entry = &transcript.entries()[0];
        assert_eq!(entry.role, EntryRole::User);
        assert_eq!(entry.body, EntryBody::Text("You: hello".to_string()));
        assert_eq!(entry.exchange, Some(pending.id()));

        assert_eq!(h.input.value(), "");
        assert_eq!(pending.input(), "hello");
        assert!(h.backend.requests.borrow().is_empty());
        assert_eq!(
            h.controller.exchange_state(pending.id()),
            Some(ExchangeState::AwaitingResponse)
        );
    }

    #[test]
    fn user_text_is_never_rendered_as_markup() {
        let h = scripted();
        h.input.type_text("<img src=x onerror=alert(1)> **not bold**");
        let _pending = h.controller.send_message().unwrap();

        assert_eq!(
            h.view.rendered.borrow()[0].body,
            EntryBody::Text("You: <img src=x onerror=alert(1)> **not bold**".to_string())
        );
    }

    #[tokio::test]
    async fn markdown_reply_is_rendered_and_scrolled_into_view() {
        let h = scripted();
        h.backend.reply(Ok(json!({ "result": { "output": "**hi**" } })));
        h.input.type_text("hello");

        let reply = h.controller.send_message().unwrap().run().await.unwrap();
        assert_eq!(reply.text, "**hi**");

        let transcript = h.controller.transcript();
        let roles = transcript
            .entries()
            .iter()
            .map(|entry| entry.role)
            .collect::<Vec<_>>();
        assert_eq!(roles, [EntryRole::User, EntryRole::Bot, EntryRole::Spacer]);

        let bot = &transcript.entries()[1];
        assert!(matches!(&bot.body, EntryBody::Markup(markup) if markup.contains("<strong>hi</strong>")));
        assert!(!bot.body.as_str().contains("**"));

        assert_eq!(h.view.scroll_top.get(), Some(280.0));
        assert!(h.notifier.messages.borrow().is_empty());
        assert_eq!(
            h.controller.exchange_state(reply.exchange),
            Some(ExchangeState::Delivered)
        );
    }

    #[tokio::test]
    async fn request_carries_agent_input_and_session() {
        let h = scripted();
        h.backend.reply(Ok(json!({ "result": { "output": "ok" } })));
        h.backend.reply(Ok(json!({ "result": { "output": "ok again" } })));

        h.input.type_text("first");
        h.controller.send_message().unwrap().run().await.unwrap();
        h.input.type_text("second");
        h.controller.send_message().unwrap().run().await.unwrap();

        let session_id = h.controller.session_id().unwrap();
        assert!(is_canonical(session_id.as_str()));

        let requests = h.backend.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].agent_name, "mailworker");
        assert_eq!(requests[0].input, "first");
        assert_eq!(requests[1].input, "second");
        assert!(requests.iter().all(|request| request.session_id == session_id.as_str()));
    }

    #[tokio::test]
    async fn missing_output_shows_the_serialized_response() {
        let h = scripted();
        h.backend.reply(Ok(json!({ "status": "ok" })));
        h.input.type_text("ping");

        let reply = h.controller.send_message().unwrap().run().await.unwrap();
        assert_eq!(reply.text, r#"{"status":"ok"}"#);
        assert!(reply.markup.contains("status"));
        assert_eq!(h.controller.transcript().len(), 3);
    }

    #[tokio::test]
    async fn network_failure_notifies_once_and_keeps_the_user_entry() {
        let h = scripted();
        h.backend.reply(Err(ExchangeError::Transport {
            stage: "send-chat-request",
            endpoint: "/chat".to_string(),
            details: "connection refused".to_string(),
        }));
        h.input.type_text("hello");

        let pending = h.controller.send_message().unwrap();
        let id = pending.id();
        let error = pending.run().await.unwrap_err();

        assert!(error.is_transport());
        assert_eq!(
            *h.notifier.messages.borrow(),
            [crate::config::DEFAULT_FAILURE_MESSAGE.to_string()]
        );

        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].role, EntryRole::User);
        assert!(matches!(
            h.controller.exchange_state(id),
            Some(ExchangeState::Failed(_))
        ));
        assert_eq!(h.view.scroll_top.get(), None);
    }

    #[tokio::test]
    async fn non_json_response_is_handled_like_a_network_failure() {
        let h = scripted();
        h.backend.reply(decode_body("<html>Bad Gateway</html>"));
        h.input.type_text("hello");

        let error = h.controller.send_message().unwrap().run().await.unwrap_err();

        assert!(error.is_decode());
        assert_eq!(h.notifier.messages.borrow().len(), 1);
        assert_eq!(h.controller.transcript().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_session_storage_fails_the_exchange() {
        let h = harness(ScriptedBackend::default(), Rc::new(BlockableStore::blocked()));
        h.input.type_text("hello");

        let error = h.controller.send_message().unwrap().run().await.unwrap_err();

        assert!(matches!(error, ExchangeError::Session { .. }));
        assert!(h.backend.requests.borrow().is_empty());
        assert_eq!(h.notifier.messages.borrow().len(), 1);
        assert_eq!(h.controller.transcript().len(), 1);
    }

    #[tokio::test]
    async fn blocked_storage_fails_each_send_until_it_returns() {
        let store = Rc::new(BlockableStore::blocked());
        let h = harness(ScriptedBackend::default(), store.clone());
        h.controller.on_load();

        for text in ["first", "second"] {
            h.input.type_text(text);
            let error = h.controller.send_message().unwrap().run().await.unwrap_err();
            assert!(matches!(error, ExchangeError::Session { .. }));
            assert_eq!(h.input.value(), "");
        }
        assert_eq!(h.notifier.messages.borrow().len(), 2);
        assert_eq!(h.controller.transcript().len(), 2);
        assert!(h.backend.requests.borrow().is_empty());
        assert_eq!(h.controller.in_flight(), 0);

        store.unblock();
        h.backend.reply(Ok(json!({ "result": { "output": "back" } })));
        h.input.type_text("third");
        let reply = h.controller.send_message().unwrap().run().await.unwrap();

        assert_eq!(reply.text, "back");
        assert_eq!(h.notifier.messages.borrow().len(), 2);
        assert_eq!(h.backend.requests.borrow().len(), 1);
        assert!(is_canonical(&h.backend.requests.borrow()[0].session_id));
    }

    #[tokio::test]
    async fn concurrent_replies_land_in_completion_order() {
        let h = harness(GatedBackend::default(), Rc::new(MemorySessionStore::new()));

        h.input.type_text("slow question");
        let mut first = Box::pin(h.controller.send_message().unwrap().run());
        h.input.type_text("quick question");
        let mut second = Box::pin(h.controller.send_message().unwrap().run());

        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(futures::poll!(second.as_mut()).is_pending());
        assert_eq!(h.controller.in_flight(), 2);

        h.backend.release(1, json!({ "result": { "output": "quick answer" } }));
        second.await.unwrap();
        assert_eq!(h.controller.in_flight(), 1);

        h.backend.release(0, json!({ "result": { "output": "slow answer" } }));
        first.await.unwrap();
        assert_eq!(h.controller.in_flight(), 0);

        let shown = h
            .controller
            .transcript()
            .entries()
            .iter()
            .map(|entry| entry.body.as_str().trim().to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            shown,
            [
                "You: slow question",
                "You: quick question",
                "<p>quick answer</p>",
                "",
                "<p>slow answer</p>",
                "",
            ]
        );
    }

    #[test]
    fn enter_submits_and_other_keys_do_not() {
        let h = scripted();
        h.input.type_text("hello");

        let ignored = h.controller.on_key_press("a");
        assert!(!ignored.prevents_default());
        assert!(ignored.into_pending().is_none());
        assert!(h.controller.transcript().is_empty());

        let submitted = h.controller.on_key_press("Enter");
        assert!(submitted.prevents_default());
        assert!(submitted.into_pending().is_some());
        assert_eq!(h.controller.transcript().len(), 1);

        // Enter on an empty field still suppresses the default submit.
        let empty = h.controller.on_key_press("Enter");
        assert!(empty.prevents_default());
        assert!(empty.into_pending().is_none());
    }

    #[test]
    fn load_scrolls_to_the_bottom() {
        let h = scripted();
        h.controller.on_load();
        assert_eq!(h.view.scroll_top.get(), Some(280.0));
    }

    #[test]
    fn session_id_is_stable_until_reset() {
        let h = scripted();
        let first = h.controller.session_id().unwrap();
        assert_eq!(h.controller.session_id().unwrap(), first);

        h.controller.reset_session().unwrap();
        assert_ne!(h.controller.session_id().unwrap(), first);
    }
}
