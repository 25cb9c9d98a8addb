//! Run event system for progress streaming.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late-joining clients can catch up.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::RunId;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Payload describing what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- Engine lifecycle ----------------------------------------------------
    EngineStateChanged {
        state: String,
        message: Option<String>,
    },

    // -- Run lifecycle -------------------------------------------------------
    RunStarted {
        run_id: RunId,
        source_name: String,
        minutes: u32,
    },
    RunProgress {
        run_id: RunId,
        progress: u8,
    },
    RunCompleted {
        run_id: RunId,
        segments: usize,
    },
    RunFailed {
        run_id: RunId,
        error: String,
    },

    // -- Archive -------------------------------------------------------------
    ArchiveEntrySkipped {
        name: String,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
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
    pub fn broadcast(&self, payload: EventPayload) {
        let event = Event::new(payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is fine.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let run_id = RunId::new();
        bus.broadcast(EventPayload::RunProgress { run_id, progress: 20 });

        let event = rx.try_recv().unwrap();
        match &event.payload {
            EventPayload::RunProgress { run_id: received, progress } => {
                assert_eq!(*received, run_id);
                assert_eq!(*progress, 20);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn recent_events_capped() {
        let bus = EventBus::new(256);
        let run_id = RunId::new();
        for progress in 0..150u32 {
            bus.broadcast(EventPayload::RunProgress {
                run_id,
                progress: (progress % 100) as u8,
            });
        }
        assert_eq!(bus.recent_events(200).len(), MAX_RECENT_EVENTS);
    }

    #[test]
    fn recent_events_newest_first() {
        let bus = EventBus::new(16);
        let run_id = RunId::new();
        bus.broadcast(EventPayload::RunStarted {
            run_id,
            source_name: "song.mp3".into(),
            minutes: 15,
        });
        bus.broadcast(EventPayload::RunCompleted { run_id, segments: 3 });

        let recent = bus.recent_events(1);
        assert!(matches!(recent[0].payload, EventPayload::RunCompleted { .. }));
    }

    #[test]
    fn no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.broadcast(EventPayload::RunFailed {
            run_id: RunId::new(),
            error: "test".into(),
        });
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = EventPayload::ArchiveEntrySkipped {
            name: "song_part_002.mp3".into(),
            reason: "content revoked".into(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""type":"archive_entry_skipped""#));
    }
}
