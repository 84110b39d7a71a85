//! Arm controller line protocol
//!
//! Pure encode/decode of the wire grammar. Nothing in this module performs
//! I/O or holds connection state beyond an open catalog block in
//! [`StreamDecoder`].

pub mod commands;
pub mod framing;
pub mod response_parser;

pub use commands::{encode, parse_command, OutgoingCommand, Preset, MAX_SPEED_MS, MIN_SPEED_MS};
pub use framing::LineBuffer;
pub use response_parser::{
    decode, IncomingMessage, JointUpdate, PositionReport, SequenceList, StreamDecoder,
};
