//! Arm Controller
//!
//! One object per arm wiring the connection, the position mirror, the
//! dispatcher, the recorder and the event notifier together. The receive
//! loop feeds the mirror and the recorder through [`EngineListener`]; every
//! outcome is republished as an [`ArmEvent`].

use super::dispatcher::{CommandDispatcher, CommandSink, DispatcherConfig};
use super::notifier::{ArmEvent, EventNotifier, EventReceiver, SubscriptionId, DEFAULT_HISTORY_SIZE};
use super::position_store::PositionStore;
use super::recorder::SequenceRecorder;
use crate::communication::{
    ConnectionManager, ConnectionParams, DefaultTransport, LinkListener, Transport,
};
use crate::protocol::{encode, IncomingMessage, OutgoingCommand, Preset};
use armctl_core::{
    ArmPose, ConnectionState, JointId, RecorderState, Result, SequenceEntry, SequenceIndex,
};
use std::sync::Arc;

/// Controller behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Preset expansion settings
    pub dispatcher: DispatcherConfig,
    /// Number of events kept for late subscribers
    pub history_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

/// Applies link traffic to the engine state
struct EngineListener {
    store: Arc<PositionStore>,
    recorder: Arc<SequenceRecorder>,
    notifier: Arc<EventNotifier>,
}

impl EngineListener {
    fn warn_skipped(&self, what: &str, skipped: &[String]) {
        for fragment in skipped {
            tracing::warn!("Skipped malformed {} '{}'", what, fragment);
            self.notifier.publish(ArmEvent::DecodeWarning(format!(
                "skipped malformed {} '{}'",
                what, fragment
            )));
        }
    }
}

impl LinkListener for EngineListener {
    fn on_message(&self, message: IncomingMessage) {
        match message {
            IncomingMessage::PositionReport(report) => {
                self.warn_skipped("position", &report.skipped);
                if !report.updates.is_empty() {
                    let pose = self.store.apply_report(&report);
                    self.notifier.publish(ArmEvent::PositionsUpdated(pose));
                }
            }
            IncomingMessage::SequenceList(list) => {
                self.warn_skipped("sequence entry", &list.skipped);
                self.recorder.observe_catalog(&list);
                self.notifier.publish(ArmEvent::SequencesUpdated(list.entries));
            }
            IncomingMessage::DeviceError(message) => {
                tracing::warn!("Device error: {}", message);
                self.notifier.publish(ArmEvent::DeviceError(message));
            }
            IncomingMessage::Unrecognized(line) => {
                tracing::debug!("Unrecognized line: {}", line);
                self.notifier.publish(ArmEvent::RawLine(line));
            }
        }
    }

    fn on_state_changed(&self, state: ConnectionState) {
        match state {
            ConnectionState::Connecting => {
                self.store.reset();
                self.recorder.reset();
            }
            ConnectionState::Disconnected => self.recorder.reset(),
            _ => {}
        }
        self.notifier.publish(ArmEvent::ConnectionChanged(state));
    }

    fn on_link_lost(&self, reason: &str) {
        self.notifier.publish(ArmEvent::ConnectionLost(reason.to_string()));
    }

    fn on_line_sent(&self, line: &str) {
        self.notifier.publish(ArmEvent::CommandSent(line.to_string()));
    }
}

/// High-level handle on one arm
pub struct ArmController {
    connection: Arc<ConnectionManager>,
    dispatcher: CommandDispatcher,
    recorder: Arc<SequenceRecorder>,
    store: Arc<PositionStore>,
    notifier: Arc<EventNotifier>,
}

impl ArmController {
    /// Create a controller opening links through `transport`
    pub fn new(transport: Arc<dyn Transport>, config: ControllerConfig) -> Self {
        let notifier = Arc::new(EventNotifier::new(config.history_size));
        let store = Arc::new(PositionStore::new());
        let recorder = Arc::new(SequenceRecorder::new(notifier.clone()));

        let listener = Arc::new(EngineListener {
            store: store.clone(),
            recorder: recorder.clone(),
            notifier: notifier.clone(),
        });
        let connection = Arc::new(ConnectionManager::new(transport, listener));
        let dispatcher =
            CommandDispatcher::new(connection.clone(), store.clone(), config.dispatcher);

        Self {
            connection,
            dispatcher,
            recorder,
            store,
            notifier,
        }
    }

    /// Create a controller using serial or TCP links as requested per connect
    pub fn with_default_transport(config: ControllerConfig) -> Self {
        Self::new(Arc::new(DefaultTransport), config)
    }

    /// Open the link
    pub fn connect(&self, params: &ConnectionParams) -> Result<()> {
        self.connection.connect(params)?;
        Ok(())
    }

    /// Close the link; a no-op when already disconnected
    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    /// Send any command, returning the number of lines written
    ///
    /// `RecordStart` and `RecordStop` go through the recorder; the index in
    /// a `RecordStart` is ignored in favour of the recorder's own counter.
    pub fn send(&self, command: &OutgoingCommand) -> Result<usize> {
        match command {
            OutgoingCommand::RecordStart(_, name) => self.start_recording(name).map(|_| 1),
            OutgoingCommand::RecordStop => self.stop_recording().map(|_| 1),
            other => self.dispatcher.send(other),
        }
    }

    /// Move one joint
    pub fn move_joint(&self, joint: JointId, angle: i32) -> Result<()> {
        self.dispatcher.move_joint(joint, angle)
    }

    /// Run a named preset
    pub fn run_preset(&self, preset: Preset) -> Result<usize> {
        self.dispatcher.run_preset(preset)
    }

    /// Set the device's inter-step delay (5..=200 ms)
    pub fn set_speed(&self, ms: u32) -> Result<()> {
        self.dispatcher.set_speed(ms)
    }

    /// Halt the arm and abort any preset in progress
    pub fn emergency_stop(&self) -> Result<()> {
        self.dispatcher.stop()
    }

    /// Ask for a position report
    pub fn request_status(&self) -> Result<()> {
        self.dispatcher.send(&OutgoingCommand::RequestStatus).map(|_| ())
    }

    /// Ask for a live potentiometer read
    pub fn read_positions(&self) -> Result<()> {
        self.dispatcher.send(&OutgoingCommand::RequestPositions).map(|_| ())
    }

    /// Send text verbatim
    pub fn send_raw(&self, text: &str) -> Result<()> {
        let line = encode(&OutgoingCommand::RawPassthrough(text.to_string()))?;
        self.connection.send_line(&line)?;
        Ok(())
    }

    /// Begin teaching a sequence, returning its index
    pub fn start_recording(&self, name: &str) -> Result<SequenceIndex> {
        self.recorder.start(name, self.connection.as_ref())
    }

    /// End teaching
    pub fn stop_recording(&self) -> Result<()> {
        self.recorder.stop(self.connection.as_ref())
    }

    /// Replay the selected sequence
    pub fn play_sequence(&self, index: Option<SequenceIndex>) -> Result<()> {
        self.recorder.play(index, self.connection.as_ref())
    }

    /// Delete the selected sequence
    pub fn delete_sequence(&self, index: Option<SequenceIndex>) -> Result<()> {
        self.recorder.delete(index, self.connection.as_ref())
    }

    /// Ask the device for its sequence catalog
    pub fn list_sequences(&self) -> Result<()> {
        self.recorder.list(self.connection.as_ref())
    }

    /// Current pose mirror
    pub fn positions(&self) -> ArmPose {
        self.store.snapshot()
    }

    /// Current recorder state
    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    /// Last catalog reported by the device
    pub fn sequences(&self) -> Vec<SequenceEntry> {
        self.recorder.catalog()
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Port of the active link
    pub fn port(&self) -> Option<String> {
        self.connection.port()
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> EventReceiver {
        self.notifier.subscribe()
    }

    /// Remove an event subscription
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Recent events, oldest first
    pub fn event_history(&self) -> Vec<ArmEvent> {
        self.notifier.history()
    }
}

impl Drop for ArmController {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}
