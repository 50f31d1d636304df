use std::cell::RefCell;
use std::io::Write;

use chatline::{
    ConfigError, EntryRole, InputField, Notifier, ScrollMetrics, TranscriptEntry, TranscriptView,
};
use chatline_session::SessionError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TermError {
    #[snafu(display("failed to load configuration on `{stage}`: {source}"))]
    Config {
        stage: &'static str,
        source: ConfigError,
    },
    #[snafu(display("session setup failed on `{stage}`: {source}"))]
    Session {
        stage: &'static str,
        source: SessionError,
    },
    #[snafu(display("failed to read stdin on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type TermResult<T> = Result<T, TermError>;

/// What one line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    ShowSession,
    ResetSession,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => Self::Quit,
            "/session" => Self::ShowSession,
            "/reset" => Self::ResetSession,
            _ => Self::Send(line.to_string()),
        }
    }
}

/// The pending line, standing in for a text field.
#[derive(Debug, Default)]
pub struct LineInput {
    line: RefCell<String>,
}

impl LineInput {
    pub fn set(&self, line: &str) {
        *self.line.borrow_mut() = line.to_string();
    }
}

impl InputField for LineInput {
    fn value(&self) -> String {
        self.line.borrow().clone()
    }

    fn clear(&self) {
        self.line.borrow_mut().clear();
    }
}

/// Prints transcript entries as they are appended.
///
/// A terminal always shows its tail, so scrolling is a no-op.
pub struct TerminalView<W: Write> {
    out: RefCell<W>,
    echo_user: bool,
}

impl<W: Write> TerminalView<W> {
    /// `echo_user` repeats user entries; off when the user just typed them.
    pub fn new(out: W, echo_user: bool) -> Self {
        Self {
            out: RefCell::new(out),
            echo_user,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> TranscriptView for TerminalView<W> {
    fn render_entry(&self, entry: &TranscriptEntry) {
        if entry.role == EntryRole::User && !self.echo_user {
            return;
        }

        let mut out = self.out.borrow_mut();
        let written = writeln!(out, "{}", entry.body.as_str()).and_then(|()| out.flush());
        if let Err(error) = written {
            tracing::warn!(entry = entry.id.0, %error, "failed to print transcript entry");
        }
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics::default()
    }

    fn set_scroll_top(&self, _offset: f64) {}
}

pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify_failure(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use chatline::{EntryBody, EntryId};

    use super::*;

    fn entry(id: u64, role: EntryRole, body: EntryBody) -> TranscriptEntry {
        TranscriptEntry {
            id: EntryId(id),
            role,
            body,
            exchange: None,
        }
    }

    #[test]
    fn commands_are_recognized_and_everything_else_is_sent() {
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse(" /exit "), Command::Quit);
        assert_eq!(Command::parse("/session"), Command::ShowSession);
        assert_eq!(Command::parse("/reset"), Command::ResetSession);
        assert_eq!(
            Command::parse("  what is /reset?"),
            Command::Send("  what is /reset?".to_string())
        );
    }

    #[test]
    fn line_input_clears() {
        let input = LineInput::default();
        input.set("hello");
        assert_eq!(input.value(), "hello");
        input.clear();
        assert_eq!(input.value(), "");
    }

    #[test]
    fn piped_sessions_echo_user_lines() {
        let view = TerminalView::new(Vec::new(), true);
        view.render_entry(&entry(1, EntryRole::User, EntryBody::Text("You: hi".into())));
        view.render_entry(&entry(2, EntryRole::Bot, EntryBody::Markup("**hey**".into())));
        view.render_entry(&entry(3, EntryRole::Spacer, EntryBody::Empty));

        let printed = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(printed, "You: hi\n**hey**\n\n");
    }

    #[test]
    fn interactive_sessions_skip_the_typed_line() {
        let view = TerminalView::new(Vec::new(), false);
        view.render_entry(&entry(1, EntryRole::User, EntryBody::Text("You: hi".into())));
        view.render_entry(&entry(2, EntryRole::Bot, EntryBody::Markup("hey".into())));

        let printed = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(printed, "hey\n");
    }
}
