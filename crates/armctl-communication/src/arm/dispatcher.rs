//! Command Dispatcher
//!
//! Turns operator intents into wire lines. Composite presets expand into a
//! fixed ordered list of joint moves paced by a configurable delay; every
//! joint move passes through the [`PositionStore`] so the mirror tracks what
//! was commanded.

use super::position_store::PositionStore;
use crate::communication::ConnectionManager;
use crate::protocol::{encode, OutgoingCommand, Preset, MAX_SPEED_MS, MIN_SPEED_MS};
use armctl_core::{CommandError, ConnectionError, JointId, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Something that accepts encoded lines for the device
pub trait CommandSink: Send + Sync {
    /// Write one newline-terminated line, blocking until the transport accepts it
    fn send_line(&self, line: &str) -> std::result::Result<(), ConnectionError>;
}

impl CommandSink for ConnectionManager {
    fn send_line(&self, line: &str) -> std::result::Result<(), ConnectionError> {
        self.send_raw(line)
    }
}

const PICK_READY: [(JointId, i32); 6] = [
    (JointId::BASE, 90),
    (JointId::SHOULDER, 100),
    (JointId::ELBOW, 80),
    (JointId::WRIST_ROTATE, 90),
    (JointId::WRIST_BEND, 90),
    (JointId::GRIPPER, 152),
];

const PICK: [(JointId, i32); 6] = [
    (JointId::BASE, 90),
    (JointId::SHOULDER, 120),
    (JointId::ELBOW, 100),
    (JointId::WRIST_ROTATE, 90),
    (JointId::WRIST_BEND, 90),
    (JointId::GRIPPER, 120),
];

const PLACE_READY: [(JointId, i32); 6] = [
    (JointId::BASE, 45),
    (JointId::SHOULDER, 80),
    (JointId::ELBOW, 60),
    (JointId::WRIST_ROTATE, 135),
    (JointId::WRIST_BEND, 90),
    (JointId::GRIPPER, 152),
];

const PLACE: [(JointId, i32); 6] = [
    (JointId::BASE, 45),
    (JointId::SHOULDER, 100),
    (JointId::ELBOW, 80),
    (JointId::WRIST_ROTATE, 135),
    (JointId::WRIST_BEND, 90),
    (JointId::GRIPPER, 152),
];

const WAVE: [(JointId, i32); 5] = [
    (JointId::WRIST_ROTATE, 60),
    (JointId::WRIST_ROTATE, 120),
    (JointId::WRIST_ROTATE, 60),
    (JointId::WRIST_ROTATE, 120),
    (JointId::WRIST_ROTATE, 90),
];

/// Delay between the steps of an expanded preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetPacing {
    /// Pick/place family
    pub pick_place: Duration,
    /// Wave gesture
    pub wave: Duration,
}

impl Default for PresetPacing {
    fn default() -> Self {
        Self {
            pick_place: Duration::from_millis(100),
            wave: Duration::from_millis(500),
        }
    }
}

/// Dispatcher behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherConfig {
    /// Step delays for expanded presets
    pub pacing: PresetPacing,
    /// Send `WAVE` as a device token instead of expanding it
    pub native_wave: bool,
}

/// Sends operator commands in order, one line at a time
pub struct CommandDispatcher {
    sink: Arc<dyn CommandSink>,
    store: Arc<PositionStore>,
    config: DispatcherConfig,
    preset_lock: Mutex<()>,
    stop_generation: AtomicU64,
}

impl CommandDispatcher {
    /// Create a dispatcher writing to `sink`
    pub fn new(
        sink: Arc<dyn CommandSink>,
        store: Arc<PositionStore>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            sink,
            store,
            config,
            preset_lock: Mutex::new(()),
            stop_generation: AtomicU64::new(0),
        }
    }

    /// Active configuration
    pub fn config(&self) -> DispatcherConfig {
        self.config
    }

    /// Send a command, returning the number of lines written
    pub fn send(&self, command: &OutgoingCommand) -> Result<usize> {
        match command {
            OutgoingCommand::SetJoint(joint, angle) => self.move_joint(*joint, *angle).map(|_| 1),
            OutgoingCommand::SetSpeed(ms) => self.set_speed(*ms).map(|_| 1),
            OutgoingCommand::NamedPreset(preset) => self.run_preset(*preset),
            OutgoingCommand::Stop => self.stop().map(|_| 1),
            other => {
                self.write(&encode(other)?)?;
                Ok(1)
            }
        }
    }

    /// Move one joint after checking it against the local bounds
    pub fn move_joint(&self, joint: JointId, angle: i32) -> Result<()> {
        let accepted = self.store.propose_local(joint, angle)?;
        self.write(&accepted.line)
    }

    /// Run a preset, expanding composite presets step by step
    ///
    /// A second preset waits for the one in progress. A [`stop`](Self::stop)
    /// issued meanwhile aborts the expansion before its next step; the lines
    /// written so far are returned.
    pub fn run_preset(&self, preset: Preset) -> Result<usize> {
        let Some(steps) = self.expansion(preset) else {
            self.write(&encode(&OutgoingCommand::NamedPreset(preset))?)?;
            return Ok(1);
        };

        let generation = self.stop_generation.load(Ordering::Acquire);
        let _serial = self.preset_lock.lock();
        let delay = self.step_delay(preset);
        tracing::debug!("Expanding {} into {} steps", preset, steps.len());

        let mut sent = 0;
        for (i, &(joint, angle)) in steps.iter().enumerate() {
            if i > 0 {
                std::thread::sleep(delay);
            }
            if self.stop_generation.load(Ordering::Acquire) != generation {
                tracing::info!("{} aborted after {} of {} steps", preset, sent, steps.len());
                break;
            }
            self.move_joint(joint, angle)?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Set the device's inter-step delay
    pub fn set_speed(&self, ms: u32) -> Result<()> {
        if !(MIN_SPEED_MS..=MAX_SPEED_MS).contains(&ms) {
            return Err(CommandError::OutOfRange {
                name: "speed",
                value: i64::from(ms),
                min: i64::from(MIN_SPEED_MS),
                max: i64::from(MAX_SPEED_MS),
            }
            .into());
        }
        self.write(&encode(&OutgoingCommand::SetSpeed(ms))?)
    }

    /// Halt immediately, aborting any preset expansion in progress
    pub fn stop(&self) -> Result<()> {
        self.stop_generation.fetch_add(1, Ordering::AcqRel);
        self.write(&encode(&OutgoingCommand::Stop)?)
    }

    /// Steps a preset expands into, `None` for device tokens
    pub fn expansion(&self, preset: Preset) -> Option<&'static [(JointId, i32)]> {
        match preset {
            Preset::Home | Preset::Fold => None,
            Preset::Wave if self.config.native_wave => None,
            Preset::Wave => Some(&WAVE),
            Preset::PickReady => Some(&PICK_READY),
            Preset::Pick => Some(&PICK),
            Preset::PlaceReady => Some(&PLACE_READY),
            Preset::Place => Some(&PLACE),
        }
    }

    fn step_delay(&self, preset: Preset) -> Duration {
        match preset {
            Preset::Wave => self.config.pacing.wave,
            _ => self.config.pacing.pick_place,
        }
    }

    fn write(&self, line: &str) -> Result<()> {
        self.sink.send_line(line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl CommandSink for RecordingSink {
        fn send_line(&self, line: &str) -> std::result::Result<(), ConnectionError> {
            self.lines.lock().push(line.trim_end().to_string());
            Ok(())
        }
    }

    fn dispatcher(
        native_wave: bool,
    ) -> (CommandDispatcher, Arc<RecordingSink>, Arc<PositionStore>) {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(PositionStore::new());
        let config = DispatcherConfig {
            pacing: PresetPacing {
                pick_place: Duration::from_millis(1),
                wave: Duration::from_millis(1),
            },
            native_wave,
        };
        (
            CommandDispatcher::new(sink.clone(), store.clone(), config),
            sink,
            store,
        )
    }

    #[test]
    fn test_place_expansion_updates_mirror() {
        let (dispatcher, sink, store) = dispatcher(false);
        assert_eq!(dispatcher.run_preset(Preset::Place).unwrap(), 6);
        assert_eq!(
            *sink.lines.lock(),
            vec!["J1:45", "J2:100", "J3:80", "J4:135", "J5:90", "J6:152"]
        );
        assert_eq!(store.snapshot().angles(), [45, 100, 80, 135, 90, 152]);
    }

    #[test]
    fn test_native_tokens_pass_through() {
        let (dispatcher, sink, _) = dispatcher(true);
        dispatcher.send(&OutgoingCommand::NamedPreset(Preset::Home)).unwrap();
        dispatcher.send(&OutgoingCommand::NamedPreset(Preset::Wave)).unwrap();
        dispatcher.send(&OutgoingCommand::RequestStatus).unwrap();
        assert_eq!(*sink.lines.lock(), vec!["HOME", "WAVE", "STATUS"]);
    }

    #[test]
    fn test_speed_range() {
        let (dispatcher, sink, _) = dispatcher(false);
        assert!(dispatcher.set_speed(5).is_ok());
        assert!(dispatcher.set_speed(200).is_ok());
        assert!(dispatcher.set_speed(4).is_err());
        assert!(dispatcher.set_speed(201).is_err());
        assert_eq!(*sink.lines.lock(), vec!["SET_SPEED:5", "SET_SPEED:200"]);
    }

    #[test]
    fn test_out_of_bounds_move_is_not_sent() {
        let (dispatcher, sink, store) = dispatcher(false);
        let err = dispatcher.move_joint(JointId::GRIPPER, 10).unwrap_err();
        assert!(err.is_command_error());
        assert!(sink.lines.lock().is_empty());
        assert_eq!(store.snapshot().get(JointId::GRIPPER), 152);
    }
}
