//! Sequence Recorder
//!
//! Teaching state machine: `Idle` ⇄ `Recording(name, index)`. Indices come
//! from a per-connection counter that starts at 0 and is advanced past any
//! index the device reports in its catalog. An index is only consumed once
//! its `RECORD_START` line has been written.
//!
//! No lock is held while a line is written, so a link failure raised from
//! inside a send may reset the recorder without deadlocking.

use super::dispatcher::CommandSink;
use super::notifier::{ArmEvent, EventNotifier};
use crate::protocol::{encode, OutgoingCommand, SequenceList};
use armctl_core::{RecorderError, RecorderState, Result, SequenceEntry, SequenceIndex};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RecorderInner {
    state: RecorderState,
    next_index: SequenceIndex,
    catalog: Vec<SequenceEntry>,
    resets: u64,
}

/// Drives sequence teaching and the cached device catalog
pub struct SequenceRecorder {
    inner: Mutex<RecorderInner>,
    notifier: Arc<EventNotifier>,
}

impl SequenceRecorder {
    /// Create an idle recorder reporting changes to `notifier`
    pub fn new(notifier: Arc<EventNotifier>) -> Self {
        Self {
            inner: Mutex::new(RecorderInner::default()),
            notifier,
        }
    }

    /// Current state
    pub fn state(&self) -> RecorderState {
        self.inner.lock().state.clone()
    }

    /// Index the next recording will use
    pub fn next_index(&self) -> SequenceIndex {
        self.inner.lock().next_index
    }

    /// Last catalog reported by the device
    pub fn catalog(&self) -> Vec<SequenceEntry> {
        self.inner.lock().catalog.clone()
    }

    /// Begin teaching `name` under the next free index
    pub fn start(&self, name: &str, sink: &dyn CommandSink) -> Result<SequenceIndex> {
        let name = name.trim();
        if name.is_empty() || name.chars().any(char::is_control) {
            return Err(RecorderError::InvalidName(name.to_string()).into());
        }

        let (index, line, resets) = {
            let mut inner = self.inner.lock();
            if let RecorderState::Recording { name, index } = &inner.state {
                return Err(RecorderError::AlreadyRecording {
                    name: name.clone(),
                    index: *index,
                }
                .into());
            }

            let index = inner.next_index;
            let line = encode(&OutgoingCommand::RecordStart(index, name.to_string()))?;
            inner.state = RecorderState::Recording {
                name: name.to_string(),
                index,
            };
            (index, line, inner.resets)
        };
        self.publish_state();

        if let Err(e) = sink.send_line(&line) {
            tracing::warn!("RECORD_START for '{}' failed: {}", name, e);
            self.abort(index);
            return Err(e.into());
        }
        self.commit(index, resets);

        tracing::info!("Recording '{}' as sequence {}", name, index);
        Ok(index)
    }

    /// End the recording in progress
    pub fn stop(&self, sink: &dyn CommandSink) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            let RecorderState::Recording { index, .. } = inner.state else {
                return Err(RecorderError::NotRecording.into());
            };
            inner.next_index = inner.next_index.max(index.saturating_add(1));
            inner.state = RecorderState::Idle;
        }
        self.publish_state();

        sink.send_line(&encode(&OutgoingCommand::RecordStop)?)?;
        Ok(())
    }

    /// Replay a stored sequence
    pub fn play(&self, index: Option<SequenceIndex>, sink: &dyn CommandSink) -> Result<()> {
        let index = index.ok_or(RecorderError::NoSuchSelection)?;
        sink.send_line(&encode(&OutgoingCommand::PlaySequence(index))?)?;
        Ok(())
    }

    /// Remove a stored sequence
    pub fn delete(&self, index: Option<SequenceIndex>, sink: &dyn CommandSink) -> Result<()> {
        let index = index.ok_or(RecorderError::NoSuchSelection)?;
        sink.send_line(&encode(&OutgoingCommand::DeleteSequence(index))?)?;
        Ok(())
    }

    /// Ask the device for its catalog
    pub fn list(&self, sink: &dyn CommandSink) -> Result<()> {
        sink.send_line(&encode(&OutgoingCommand::ListSequences)?)?;
        Ok(())
    }

    /// Replace the cached catalog with a device report
    pub fn observe_catalog(&self, list: &SequenceList) {
        let mut inner = self.inner.lock();
        inner.catalog = list.entries.clone();
        if let Some(highest) = list.entries.iter().map(|e| e.index).max() {
            inner.next_index = inner.next_index.max(highest.saturating_add(1));
        }
    }

    /// Return to `Idle` and restart the counter
    pub fn reset(&self) {
        let was_recording = {
            let mut inner = self.inner.lock();
            let was_recording = inner.state.is_recording();
            let resets = inner.resets.wrapping_add(1);
            *inner = RecorderInner {
                resets,
                ..RecorderInner::default()
            };
            was_recording
        };
        if was_recording {
            tracing::info!("Recording abandoned");
            self.publish_state();
        }
    }

    /// Consume `index` unless the recorder was reset since it was handed out
    fn commit(&self, index: SequenceIndex, resets: u64) {
        let mut inner = self.inner.lock();
        if inner.resets == resets {
            inner.next_index = inner.next_index.max(index.saturating_add(1));
        }
    }

    /// Drop back to `Idle` if still recording under `index`
    fn abort(&self, index: SequenceIndex) {
        let aborted = {
            let mut inner = self.inner.lock();
            match inner.state {
                RecorderState::Recording { index: current, .. } if current == index => {
                    inner.state = RecorderState::Idle;
                    true
                }
                _ => false,
            }
        };
        if aborted {
            self.publish_state();
        }
    }

    fn publish_state(&self) {
        let state = self.state();
        self.notifier.publish(ArmEvent::RecorderChanged(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armctl_core::{ConnectionError, Error};

    #[derive(Default)]
    struct LineLog {
        lines: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CommandSink for LineLog {
        fn send_line(&self, line: &str) -> std::result::Result<(), ConnectionError> {
            if self.fail {
                return Err(ConnectionError::NotConnected);
            }
            self.lines.lock().push(line.trim_end().to_string());
            Ok(())
        }
    }

    fn recorder() -> SequenceRecorder {
        SequenceRecorder::new(Arc::new(EventNotifier::default()))
    }

    #[test]
    fn test_start_stop_cycle() {
        let recorder = recorder();
        let sink = LineLog::default();

        assert_eq!(recorder.start(" pick ", &sink).unwrap(), 0);
        assert_eq!(
            recorder.state(),
            RecorderState::Recording {
                name: "pick".into(),
                index: 0
            }
        );
        recorder.stop(&sink).unwrap();
        assert_eq!(recorder.start("place", &sink).unwrap(), 1);

        assert_eq!(
            *sink.lines.lock(),
            vec!["RECORD_START:0:pick", "RECORD_STOP", "RECORD_START:1:place"]
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let recorder = recorder();
        let sink = LineLog::default();

        assert!(matches!(
            recorder.stop(&sink),
            Err(Error::Recorder(RecorderError::NotRecording))
        ));
        assert!(matches!(
            recorder.start("  ", &sink),
            Err(Error::Recorder(RecorderError::InvalidName(_)))
        ));
        recorder.start("seq", &sink).unwrap();
        assert!(matches!(
            recorder.start("seq2", &sink),
            Err(Error::Recorder(RecorderError::AlreadyRecording { index: 0, .. }))
        ));
    }

    #[test]
    fn test_missing_selection() {
        let recorder = recorder();
        let sink = LineLog::default();
        assert!(matches!(
            recorder.play(None, &sink),
            Err(Error::Recorder(RecorderError::NoSuchSelection))
        ));
        assert!(recorder.delete(None, &sink).is_err());
        recorder.play(Some(3), &sink).unwrap();
        assert_eq!(*sink.lines.lock(), vec!["PLAY_SEQUENCE:3"]);
    }

    #[test]
    fn test_failed_start_aborts() {
        let recorder = recorder();
        let sink = LineLog {
            fail: true,
            ..LineLog::default()
        };
        assert!(recorder.start("x", &sink).is_err());
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn test_failed_start_keeps_index() {
        let recorder = recorder();
        let broken = LineLog {
            fail: true,
            ..LineLog::default()
        };
        assert!(recorder.start("early", &broken).is_err());
        assert_eq!(recorder.next_index(), 0);

        let sink = LineLog::default();
        assert_eq!(recorder.start("first", &sink).unwrap(), 0);
        assert_eq!(recorder.next_index(), 1);
        assert_eq!(*sink.lines.lock(), vec!["RECORD_START:0:first"]);
    }

    #[test]
    fn test_catalog_advances_counter() {
        let recorder = recorder();
        let list = SequenceList {
            entries: vec![SequenceEntry::new(0, "a"), SequenceEntry::new(4, "b")],
            skipped: Vec::new(),
        };
        recorder.observe_catalog(&list);
        assert_eq!(recorder.next_index(), 5);
        assert_eq!(recorder.catalog().len(), 2);

        recorder.reset();
        assert_eq!(recorder.next_index(), 0);
        assert!(recorder.catalog().is_empty());
    }
}
