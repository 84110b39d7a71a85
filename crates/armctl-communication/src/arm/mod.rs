//! Arm protocol engine
//!
//! Stateful layer above the codec and the connection manager:
//! - Position mirror with local bounds checks and trusted device reports
//! - Command dispatcher with paced preset expansion
//! - Sequence recorder state machine and catalog cache
//! - Event notifier for UI consumers
//! - The [`ArmController`] facade tying them together

pub mod controller;
pub mod dispatcher;
pub mod notifier;
pub mod position_store;
pub mod recorder;

pub use controller::{ArmController, ControllerConfig};
pub use dispatcher::{CommandDispatcher, CommandSink, DispatcherConfig, PresetPacing};
pub use notifier::{ArmEvent, EventNotifier, EventReceiver, SubscriptionId, DEFAULT_HISTORY_SIZE};
pub use position_store::{AcceptedMove, PositionStore};
pub use recorder::SequenceRecorder;
