#![deny(unsafe_code)]

//! Chat exchange controller shared by the browser widget and the terminal client.
//!
//! The controller owns the transcript and drives one JSON round trip per send.
//! Everything host specific (input field, transcript surface, notifications,
//! transport, session storage) is handed in through the traits re-exported here.
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
/// Wire types and reply extraction for the `/chat` endpoint.
pub mod exchange;
pub mod input;
pub mod markdown;
pub mod notify;
pub mod scroll_manager;
pub mod tracker;
pub mod transcript;

pub use backend::ChatBackend;
#[cfg(not(target_arch = "wasm32"))]
pub use backend::HttpBackend;
pub use config::WidgetConfig;
pub use controller::{ChatController, ChatSurface, KeyOutcome, PendingExchange};
pub use error::{ConfigError, ConfigResult, ExchangeError, ExchangeResult};
pub use exchange::{ExchangeReply, ExchangeRequest, decode_body, extract_reply_text};
pub use input::{InputField, SUBMIT_KEY, is_submit_key};
pub use markdown::{CommonMarkRenderer, MarkdownRenderer, PlainTextRenderer};
pub use notify::Notifier;
pub use scroll_manager::ScrollManager;
pub use tracker::{
    ExchangeId, ExchangeState, ExchangeTracker, ExchangeTransition, ExchangeTransitionRejection,
};
pub use transcript::{
    EntryBody, EntryId, EntryRole, ScrollMetrics, Transcript, TranscriptEntry, TranscriptView,
};
