//! Search-box debouncing.
//!
//! Keystrokes update the pending text; the pipeline only sees the new text
//! once it has been left alone for [`SEARCH_DEBOUNCE`].

use std::time::{Duration, Instant};

/// Quiet period before typed search text is applied.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Tracks the applied search text and the latest unapplied edit.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    applied: String,
    /// Latest edit and when it happened.
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchDebouncer {
    pub fn new() -> Self {
        Self {
            applied: String::new(),
            pending: None,
        }
    }

    /// Record an edit made now.
    pub fn input(&mut self, text: impl Into<String>) {
        self.input_at(text, Instant::now());
    }

    /// Record an edit made at `at`. Each edit restarts the quiet period.
    pub fn input_at(&mut self, text: impl Into<String>, at: Instant) {
        self.pending = Some((text.into(), at));
    }

    /// Apply the pending edit if it has settled by `now`.
    ///
    /// Returns the newly applied text, or `None` when nothing changed.
    pub fn poll_at(&mut self, now: Instant) -> Option<&str> {
        let settled = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.duration_since(*at) >= SEARCH_DEBOUNCE);
        if !settled {
            return None;
        }
        self.take_pending()
    }

    pub fn poll(&mut self) -> Option<&str> {
        self.poll_at(Instant::now())
    }

    /// Apply the pending edit immediately (e.g. on Enter).
    pub fn flush(&mut self) -> Option<&str> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<&str> {
        let (text, _) = self.pending.take()?;
        if text == self.applied {
            return None;
        }
        tracing::debug!(search = %text, "search text applied");
        self.applied = text;
        Some(&self.applied)
    }

    /// When the pending edit will settle, for scheduling the next poll.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + SEARCH_DEBOUNCE)
    }

    /// Text the pipeline should currently use.
    pub fn applied(&self) -> &str {
        &self.applied
    }
}
