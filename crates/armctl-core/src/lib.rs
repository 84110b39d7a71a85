//! # armctl Core
//!
//! Core types and errors for armctl.
//! Provides the joint model, pose snapshots, sequence catalog entries,
//! connection and recorder state, and the shared error taxonomy.

pub mod data;
pub mod error;

pub use data::{
    ArmPose, ConnectionState, JointBounds, JointId, RecorderState, SequenceEntry, SequenceIndex,
    HOME_ANGLES, JOINT_BOUNDS, JOINT_COUNT,
};

pub use error::{CommandError, ConnectionError, Error, RecorderError, Result};
