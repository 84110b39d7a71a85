//! Event system for the arm engine
//!
//! Provides:
//! - Event types for pose, catalog, connection and recorder changes
//! - A notifier fanning events out to any number of subscribers
//! - A bounded history for late subscribers and diagnostics
//!
//! Each subscriber owns an unbounded channel and drains it on its own
//! schedule. Subscribers that dropped their receiver are pruned on the next
//! publish.

use armctl_core::{ArmPose, ConnectionState, RecorderState, SequenceEntry};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default number of events kept in the history
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// Engine event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmEvent {
    /// The pose mirror changed after a device report
    PositionsUpdated(ArmPose),
    /// The device sent a new sequence catalog
    SequencesUpdated(Vec<SequenceEntry>),
    /// The device reported a fault; the link stays open
    DeviceError(String),
    /// A line the engine does not understand
    RawLine(String),
    /// Part of a report or catalog could not be decoded
    DecodeWarning(String),
    /// A line was written to the device
    CommandSent(String),
    /// Connection state changed
    ConnectionChanged(ConnectionState),
    /// The link failed without a disconnect request
    ConnectionLost(String),
    /// Sequence recorder state changed
    RecorderChanged(RecorderState),
}

impl fmt::Display for ArmEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmEvent::PositionsUpdated(pose) => write!(f, "Positions: {}", pose),
            ArmEvent::SequencesUpdated(entries) => {
                write!(f, "Sequences:")?;
                if entries.is_empty() {
                    return write!(f, " none");
                }
                for entry in entries {
                    write!(f, " [{}]", entry)?;
                }
                Ok(())
            }
            ArmEvent::DeviceError(msg) => write!(f, "Device error: {}", msg),
            ArmEvent::RawLine(line) => write!(f, "Device: {}", line),
            ArmEvent::DecodeWarning(msg) => write!(f, "Decode warning: {}", msg),
            ArmEvent::CommandSent(line) => write!(f, "Sent: {}", line),
            ArmEvent::ConnectionChanged(state) => write!(f, "Connection: {}", state),
            ArmEvent::ConnectionLost(reason) => write!(f, "Connection lost: {}", reason),
            ArmEvent::RecorderChanged(state) => write!(f, "Recorder: {}", state),
        }
    }
}

/// Handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a subscription
#[derive(Debug)]
pub struct EventReceiver {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<ArmEvent>,
}

impl EventReceiver {
    /// Subscription this receiver belongs to
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event; `None` once unsubscribed
    pub async fn recv(&mut self) -> Option<ArmEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is queued
    pub fn try_recv(&mut self) -> Option<ArmEvent> {
        self.rx.try_recv().ok()
    }

    /// Block the current thread until the next event
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<ArmEvent> {
        self.rx.blocking_recv()
    }

    /// Take every queued event without waiting
    pub fn drain(&mut self) -> Vec<ArmEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Fans engine events out to subscribers
pub struct EventNotifier {
    subscribers: RwLock<HashMap<SubscriptionId, mpsc::UnboundedSender<ArmEvent>>>,
    history: Mutex<VecDeque<ArmEvent>>,
    history_size: usize,
}

impl EventNotifier {
    /// Create a notifier keeping the last `history_size` events
    pub fn new(history_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(history_size)),
            history_size,
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers.write().insert(id, tx);
        tracing::debug!("Event subscriber {} added", id);
        EventReceiver { id, rx }
    }

    /// Remove a subscriber; returns false if it was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.write().remove(&id).is_some()
    }

    /// Publish an event to every live subscriber
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: ArmEvent) -> usize {
        if self.history_size > 0 {
            let mut history = self.history.lock();
            if history.len() == self.history_size {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|id, tx| {
            let alive = tx.send(event.clone()).is_ok();
            if !alive {
                tracing::debug!("Event subscriber {} dropped", id);
            }
            alive
        });
        subscribers.len()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Most recent events, oldest first
    pub fn history(&self) -> Vec<ArmEvent> {
        self.history.lock().iter().cloned().collect()
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscribers() {
        let notifier = EventNotifier::default();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        assert_eq!(notifier.publish(ArmEvent::DeviceError("jam".into())), 2);
        assert_eq!(a.try_recv(), Some(ArmEvent::DeviceError("jam".into())));
        assert_eq!(b.try_recv(), Some(ArmEvent::DeviceError("jam".into())));
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let notifier = EventNotifier::default();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());

        assert_eq!(notifier.publish(ArmEvent::RawLine("hello".into())), 1);
        assert_eq!(notifier.subscriber_count(), 1);
        assert!(notifier.unsubscribe(kept.id()));
        assert!(!notifier.unsubscribe(kept.id()));
    }

    #[test]
    fn test_history_is_bounded() {
        let notifier = EventNotifier::new(2);
        for i in 0..3 {
            notifier.publish(ArmEvent::RawLine(i.to_string()));
        }
        assert_eq!(
            notifier.history(),
            vec![ArmEvent::RawLine("1".into()), ArmEvent::RawLine("2".into())]
        );
    }

    #[test]
    fn test_event_display() {
        let event = ArmEvent::SequencesUpdated(vec![SequenceEntry::new(0, "foo")]);
        assert_eq!(event.to_string(), "Sequences: [0: foo]");
        assert_eq!(
            ArmEvent::ConnectionChanged(ConnectionState::Connected).to_string(),
            "Connection: Connected"
        );
    }
}
