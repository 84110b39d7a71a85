//! Data models for the arm controller
//!
//! Joint identifiers and limits, pose snapshots, stored sequence entries,
//! and the connection and recorder state enums shared across crates.

pub mod joints;
pub mod pose;

pub use joints::{JointBounds, JointId, HOME_ANGLES, JOINT_BOUNDS, JOINT_COUNT};
pub use pose::ArmPose;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-side identifier of a stored sequence
pub type SequenceIndex = u32;

/// One entry of the device's sequence catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    /// Index assigned by the device
    pub index: SequenceIndex,
    /// Name given when the sequence was taught
    pub name: String,
}

impl SequenceEntry {
    /// Create a new entry
    pub fn new(index: SequenceIndex, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for SequenceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.index, self.name)
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No link
    #[default]
    Disconnected,
    /// Transport is being opened
    Connecting,
    /// Link is up and the receive loop is running
    Connected,
    /// Disconnect in progress
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// Sequence teaching state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecorderState {
    /// Not teaching
    #[default]
    Idle,
    /// Teaching the named sequence
    Recording {
        /// Sequence name
        name: String,
        /// Sequence index sent with RECORD_START
        index: SequenceIndex,
    },
}

impl RecorderState {
    /// Check whether a recording is in progress
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Recording { name, index } => write!(f, "Recording '{}' ({})", name, index),
        }
    }
}
