//! Incremental `text/event-stream` decoder for job events.
//!
//! Only `data:` fields matter; `event:`, `id:` and `retry:` are ignored and
//! comment lines (`:keep-alive`) are heartbeats. A blank line dispatches the
//! accumulated data. Payloads that are not a [`JobEvent`] are dropped with a
//! debug log rather than failing the stream.

use sc_core::events::JobEvent;

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes after the last complete line.
    partial: Vec<u8>,
    /// `data:` lines of the event being assembled.
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body, returning every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<JobEvent> {
        self.partial.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=pos).collect();
            if let Some(event) = self.line(&raw) {
                events.push(event);
            }
        }

        events
    }

    /// Flush an event left unterminated when the stream closed.
    pub fn finish(&mut self) -> Option<JobEvent> {
        let tail = std::mem::take(&mut self.partial);
        if !tail.is_empty() {
            if let Some(event) = self.line(&tail) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, raw: &[u8]) -> Option<JobEvent> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            tracing::trace!("sse heartbeat");
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<JobEvent> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();

        match serde_json::from_str::<JobEvent>(&payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(error = %e, payload = %payload, "ignoring malformed push event");
                None
            }
        }
    }
}
