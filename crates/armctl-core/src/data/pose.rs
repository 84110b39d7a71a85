//! Arm pose snapshot

use super::joints::{JointId, HOME_ANGLES, JOINT_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Angles of all six joints, in degrees
///
/// A pose is a plain value: copies taken from the position store never change
/// underneath the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmPose {
    angles: [i32; JOINT_COUNT],
}

impl ArmPose {
    /// Create a pose from raw angles in J1..J6 order
    pub fn from_angles(angles: [i32; JOINT_COUNT]) -> Self {
        Self { angles }
    }

    /// The fixed home pose
    pub fn home() -> Self {
        Self::from_angles(HOME_ANGLES)
    }

    /// Angle of one joint
    pub fn get(&self, joint: JointId) -> i32 {
        self.angles[joint.index()]
    }

    /// Set the angle of one joint
    pub fn set(&mut self, joint: JointId, angle: i32) {
        self.angles[joint.index()] = angle;
    }

    /// Raw angles in J1..J6 order
    pub fn angles(&self) -> [i32; JOINT_COUNT] {
        self.angles
    }

    /// Iterate `(joint, angle)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (JointId, i32)> + '_ {
        JointId::all().map(move |joint| (joint, self.get(joint)))
    }

    /// Check that every angle lies within its joint's bounds
    pub fn within_bounds(&self) -> bool {
        self.iter().all(|(joint, angle)| joint.bounds().contains(angle))
    }
}

impl Default for ArmPose {
    fn default() -> Self {
        Self::home()
    }
}

impl fmt::Display for ArmPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(joint, angle)| format!("{}:{}", joint, angle))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
