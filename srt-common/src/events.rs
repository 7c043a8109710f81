//! Event types for the SRT event system
//!
//! Provides the shared event definitions and the EventBus used to notify
//! connected views (via SSE) that scores or sync state changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// SRT event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Views treat every event as "derived scores may have changed" and re-read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SrtEvent {
    /// A rater edit was staged locally (not yet committed)
    EditStaged {
        indicator_code: String,
        column_key: String,
        source_tag: String,
        /// Pending edits now held for this source
        pending_for_source: usize,
        timestamp: DateTime<Utc>,
    },

    /// An indicator comment was staged locally (not yet committed)
    CommentStaged {
        indicator_code: String,
        /// Pending comments now held across all indicators
        pending_comments: usize,
        timestamp: DateTime<Utc>,
    },

    /// Unsaved edits for a source were abandoned
    EditsDiscarded {
        source_tag: String,
        discarded: usize,
        timestamp: DateTime<Utc>,
    },

    /// A batch commit for a source began
    FlushStarted {
        source_tag: String,
        batch_id: Uuid,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A batch commit for a source was confirmed by the persistence service
    FlushSucceeded {
        source_tag: String,
        batch_id: Uuid,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A batch commit failed; local edits are untouched
    FlushFailed {
        source_tag: String,
        batch_id: Uuid,
        /// True when the failure happened while the client believed it was offline
        offline: bool,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Online/offline signal changed
    ConnectivityChanged {
        online: bool,
        timestamp: DateTime<Utc>,
    },

    /// Confirmed scores were re-read from the persistence service
    RemoteRefreshed {
        records: usize,
        timestamp: DateTime<Utc>,
    },

    /// All confirmed and pending scores for the school were cleared
    ScoresReset {
        school_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl SrtEvent {
    /// SSE event name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            SrtEvent::EditStaged { .. } => "EditStaged",
            SrtEvent::CommentStaged { .. } => "CommentStaged",
            SrtEvent::EditsDiscarded { .. } => "EditsDiscarded",
            SrtEvent::FlushStarted { .. } => "FlushStarted",
            SrtEvent::FlushSucceeded { .. } => "FlushSucceeded",
            SrtEvent::FlushFailed { .. } => "FlushFailed",
            SrtEvent::ConnectivityChanged { .. } => "ConnectivityChanged",
            SrtEvent::RemoteRefreshed { .. } => "RemoteRefreshed",
            SrtEvent::ScoresReset { .. } => "ScoresReset",
        }
    }
}

/// Broadcast channel for SrtEvent
///
/// Slow subscribers lose the oldest events rather than blocking emitters.
pub struct EventBus {
    tx: broadcast::Sender<SrtEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use srt_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SrtEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: SrtEvent) -> Result<usize, broadcast::error::SendError<SrtEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SrtEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
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

    fn connectivity(online: bool) -> SrtEvent {
        SrtEvent::ConnectivityChanged {
            online,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(8);
        assert!(bus.emit(connectivity(true)).is_err());
        // Lossy emit never panics
        bus.emit_lossy(connectivity(false));
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let event = connectivity(false);
        bus.emit(event.clone()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = SrtEvent::FlushStarted {
            source_tag: "LT1".to_string(),
            batch_id: Uuid::new_v4(),
            count: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["source_tag"], "LT1");
        assert_eq!(json["count"], 3);
    }
}
