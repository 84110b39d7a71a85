//! Error handling for armctl
//!
//! Provides error types for all layers of the protocol engine:
//! - Connection errors (transport open, write path, link loss)
//! - Command errors (local validation of outgoing intents)
//! - Recorder errors (sequence teaching state machine violations)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to the physical link with the arm controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The transport could not be opened
    #[error("Failed to open {port}: {reason}")]
    ConnectFailed {
        /// The port or address that failed to open.
        port: String,
        /// The reason the open failed.
        reason: String,
    },

    /// A connection is already active
    #[error("Already connected to {port}")]
    AlreadyConnected {
        /// The port of the active connection.
        port: String,
    },

    /// No connection is active
    #[error("Not connected")]
    NotConnected,

    /// Writing to the transport failed
    #[error("Send failed: {reason}")]
    SendFailed {
        /// The reason the write failed.
        reason: String,
    },

    /// The connection parameters are not usable
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },
}

/// Command error type
///
/// Local validation failures on outgoing intents. None of these ever reach
/// the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A command could not be encoded onto the wire
    #[error("Cannot encode command: {reason}")]
    Encoding {
        /// The reason the command cannot be encoded.
        reason: String,
    },

    /// A joint angle lies outside the joint's bounds
    #[error("J{joint} angle {angle} outside {min}..={max}")]
    OutOfBounds {
        /// The joint number (1..=6).
        joint: u8,
        /// The rejected angle.
        angle: i32,
        /// The lower bound.
        min: i32,
        /// The upper bound.
        max: i32,
    },

    /// A scalar parameter lies outside its accepted range
    #[error("{name} value {value} outside {min}..={max}")]
    OutOfRange {
        /// The parameter name.
        name: &'static str,
        /// The rejected value.
        value: i64,
        /// The lower bound.
        min: i64,
        /// The upper bound.
        max: i64,
    },

    /// A joint number outside 1..=6
    #[error("Invalid joint number {0}")]
    InvalidJoint(u8),

    /// A preset tag that is not in the preset table
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
}

/// Recorder error type
///
/// Violations of the sequence teaching state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// A recording is already in progress
    #[error("Already recording '{name}' (index {index})")]
    AlreadyRecording {
        /// The name of the active recording.
        name: String,
        /// The index of the active recording.
        index: u32,
    },

    /// The sequence name is empty or unusable
    #[error("Invalid sequence name '{0}'")]
    InvalidName(String),

    /// Stop was requested while idle
    #[error("Not recording")]
    NotRecording,

    /// Play or delete was requested without a selected sequence
    #[error("No sequence selected")]
    NoSuchSelection,
}

/// Main error type for armctl
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Recorder error
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a local validation error
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Command(_))
    }

    /// Check if this is a recorder error
    pub fn is_recorder_error(&self) -> bool {
        matches!(self, Error::Recorder(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
