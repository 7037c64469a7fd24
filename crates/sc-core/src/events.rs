//! Push-channel events for long-running batch jobs.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late-joining subscribers can catch
//! up. The backend delivers events at most once per logical step and gives
//! no contiguity guarantee; consumers must tolerate gaps and reordering.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::JobId;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Payload pushed by the backend for one batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Intermediate progress.
    Progress {
        #[serde(rename = "jobId")]
        job_id: JobId,
        /// Monotonic sequence number when the backend provides one;
        /// otherwise `current` orders progress events.
        #[serde(default)]
        sequence: Option<u64>,
        current: u64,
        total: u64,
        #[serde(default)]
        completed: u64,
        #[serde(default)]
        failed: u64,
    },
    /// Terminal marker; authoritative regardless of prior events.
    Finished {
        #[serde(rename = "jobId")]
        job_id: JobId,
        succeeded: u64,
        #[serde(default)]
        failed: u64,
        #[serde(default)]
        skipped: u64,
    },
}

impl JobEvent {
    /// The job this event belongs to.
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Progress { job_id, .. } | JobEvent::Finished { job_id, .. } => *job_id,
        }
    }

    /// Whether this event ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Finished { .. })
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event was received.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub payload: JobEvent,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: JobEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn publish(&self, payload: JobEvent) {
        let event = Event::new(payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.tx.receiver_count())
            .field("recent", &self.recent.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(job_id: JobId, current: u64) -> JobEvent {
        JobEvent::Progress {
            job_id,
            sequence: None,
            current,
            total: 10,
            completed: current,
            failed: 0,
        }
    }

    #[test]
    fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let job_id = JobId::new();
        bus.publish(progress(job_id, 1));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.payload.job_id(), job_id);
        assert!(!event.payload.is_terminal());
    }

    #[test]
    fn recent_events_capped() {
        let bus = EventBus::new(256);
        let job_id = JobId::new();

        for i in 0..150 {
            bus.publish(progress(job_id, i));
        }

        let recent = bus.recent_events(200);
        assert_eq!(recent.len(), MAX_RECENT_EVENTS);
    }

    #[test]
    fn recent_events_newest_first() {
        let bus = EventBus::new(16);
        let job_id = JobId::new();

        for i in 0..10 {
            bus.publish(progress(job_id, i));
        }
        bus.publish(JobEvent::Finished {
            job_id,
            succeeded: 9,
            failed: 1,
            skipped: 0,
        });

        let recent = bus.recent_events(3);
        assert_eq!(recent.len(), 3);
        assert!(recent[0].payload.is_terminal());
    }

    #[test]
    fn no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.publish(progress(JobId::new(), 0));
    }

    #[test]
    fn job_event_wire_format() {
        let job_id = JobId::new();
        let json = format!(
            r#"{{"type":"progress","jobId":"{job_id}","current":3,"total":10,"completed":2,"failed":1}}"#
        );
        let event: JobEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(
            event,
            JobEvent::Progress {
                job_id,
                sequence: None,
                current: 3,
                total: 10,
                completed: 2,
                failed: 1,
            }
        );

        let json = format!(r#"{{"type":"finished","jobId":"{job_id}","succeeded":7,"failed":3}}"#);
        let event: JobEvent = serde_json::from_str(&json).unwrap();
        assert!(event.is_terminal());
        assert_eq!(event.job_id(), job_id);
    }

    #[test]
    fn default_event_bus() {
        let bus = EventBus::default();
        assert!(bus.recent_events(10).is_empty());
    }
}
