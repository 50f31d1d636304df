use std::rc::Rc;

use super::scroll_manager::ScrollManager;
use super::tracker::ExchangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRole {
    User,
    Bot,
    Spacer,
}

/// What a surface should show for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// Shown literally; never interpreted as markup.
    Text(String),
    /// Rendered HTML from a trusted backend reply.
    Markup(String),
    Empty,
}

impl EntryBody {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(content) | Self::Markup(content) => content,
            Self::Empty => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub role: EntryRole,
    pub body: EntryBody,
    pub exchange: Option<ExchangeId>,
}

/// Visible scroll position of a transcript surface, in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn max_offset(&self) -> f64 {
        self.scroll_height - self.client_height
    }
}

/// Surface a transcript is drawn on (a DOM container, a terminal, a test recorder).
pub trait TranscriptView {
    fn render_entry(&self, entry: &TranscriptEntry);
    fn scroll_metrics(&self) -> ScrollMetrics;
    fn set_scroll_top(&self, offset: f64);
}

/// Append-only log of user and bot entries, mirrored onto its view as it grows.
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_entry_id: u64,
    view: Rc<dyn TranscriptView>,
    scroll: ScrollManager,
}

impl Transcript {
    pub fn new(view: Rc<dyn TranscriptView>) -> Self {
        Self {
            entries: Vec::new(),
            next_entry_id: 1,
            view,
            scroll: ScrollManager::new(),
        }
    }

    /// Appends `"<label>: <text>"` as plain text.
    pub fn append_user(
        &mut self,
        label: &str,
        text: &str,
        exchange: Option<ExchangeId>,
    ) -> EntryId {
        self.push(
            EntryRole::User,
            EntryBody::Text(format!("{label}: {text}")),
            exchange,
        )
    }

    pub fn append_bot(&mut self, markup: String, exchange: Option<ExchangeId>) -> EntryId {
        self.push(EntryRole::Bot, EntryBody::Markup(markup), exchange)
    }

    pub fn append_spacer(&mut self, exchange: Option<ExchangeId>) -> EntryId {
        self.push(EntryRole::Spacer, EntryBody::Empty, exchange)
    }

    pub fn scroll_to_bottom(&mut self) -> bool {
        self.scroll.request_scroll_to_bottom();
        self.scroll.apply_pending_scroll(self.view.as_ref())
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn scroll_manager(&self) -> &ScrollManager {
        &self.scroll
    }

    fn push(&mut self, role: EntryRole, body: EntryBody, exchange: Option<ExchangeId>) -> EntryId {
        let id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;

        let entry = TranscriptEntry {
            id,
            role,
            body,
            exchange,
        };
        self.view.render_entry(&entry);
        self.entries.push(entry);
        id
    }
}
