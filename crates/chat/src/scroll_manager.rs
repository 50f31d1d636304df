use super::transcript::{ScrollMetrics, TranscriptView};

/// Pending scroll requests for a transcript surface, independent from its content.
#[derive(Debug, Default)]
pub struct ScrollManager {
    pending_scroll_to_bottom: bool,
    last_applied_offset: Option<f64>,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.pending_scroll_to_bottom = true;
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll_to_bottom
    }

    /// Offset of the last scroll this manager performed, if any.
    pub fn last_applied_offset(&self) -> Option<f64> {
        self.last_applied_offset
    }

    /// Moves the view to its bottom when a request is pending. Returns whether it scrolled.
    pub fn apply_pending_scroll(&mut self, view: &dyn TranscriptView) -> bool {
        if !self.pending_scroll_to_bottom {
            return false;
        }

        let target = bottom_offset(view.scroll_metrics());
        view.set_scroll_top(target);
        self.last_applied_offset = Some(target);
        self.pending_scroll_to_bottom = false;
        true
    }
}

fn bottom_offset(metrics: ScrollMetrics) -> f64 {
    let max_offset = metrics.max_offset();
    if max_offset > 0.0 { max_offset } else { 0.0 }
}
