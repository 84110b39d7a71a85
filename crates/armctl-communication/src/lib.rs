//! # armctl Communication
//!
//! Wire protocol, transports and the protocol engine for the six-joint arm.
//! Supports Serial/USB and TCP links, plus an in-memory loopback for tests.

pub mod arm;
pub mod communication;
pub mod protocol;

pub use arm::{
    ArmController, ArmEvent, CommandDispatcher, CommandSink, ControllerConfig, DispatcherConfig,
    EventNotifier, EventReceiver, PositionStore, PresetPacing, SequenceRecorder, SubscriptionId,
};

pub use communication::{
    list_ports, ConnectionDriver, ConnectionManager, ConnectionParams, DefaultTransport,
    LinkListener, LoopbackDevice, LoopbackTransport, SerialPortInfo, SerialTransport,
    TcpTransport, Transport,
};

pub use protocol::{decode, encode, parse_command, IncomingMessage, OutgoingCommand, Preset};
