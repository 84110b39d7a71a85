//! Joint identifiers and their angle limits

use crate::error::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of controllable joints on the arm
pub const JOINT_COUNT: usize = 6;

/// Joint limits (degrees), indexed by joint number minus one
pub const JOINT_BOUNDS: [JointBounds; JOINT_COUNT] = [
    JointBounds::new(0, 180),
    JointBounds::new(30, 150),
    JointBounds::new(0, 180),
    JointBounds::new(0, 180),
    JointBounds::new(0, 180),
    JointBounds::new(90, 180),
];

/// Default home position
pub const HOME_ANGLES: [i32; JOINT_COUNT] = [92, 85, 45, 108, 80, 152];

const JOINT_NAMES: [&str; JOINT_COUNT] = [
    "Base",
    "Shoulder",
    "Elbow",
    "Wrist Rotate",
    "Wrist Bend",
    "Gripper",
];

/// Inclusive angle range for one joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointBounds {
    /// Lowest accepted angle
    pub min: i32,
    /// Highest accepted angle
    pub max: i32,
}

impl JointBounds {
    /// Create a new range
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Check whether an angle lies within the range
    pub fn contains(&self, angle: i32) -> bool {
        (self.min..=self.max).contains(&angle)
    }
}

/// One of the six joints, addressed J1..J6 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct JointId(u8);

impl JointId {
    /// Base rotation
    pub const BASE: JointId = JointId(1);
    /// Shoulder
    pub const SHOULDER: JointId = JointId(2);
    /// Elbow
    pub const ELBOW: JointId = JointId(3);
    /// Wrist rotation
    pub const WRIST_ROTATE: JointId = JointId(4);
    /// Wrist bend
    pub const WRIST_BEND: JointId = JointId(5);
    /// Gripper
    pub const GRIPPER: JointId = JointId(6);

    /// Create a joint id from its wire number (1..=6)
    pub fn new(number: u8) -> Option<Self> {
        (1..=JOINT_COUNT as u8)
            .contains(&number)
            .then_some(Self(number))
    }

    /// All joints in wire order
    pub fn all() -> impl Iterator<Item = JointId> {
        (1..=JOINT_COUNT as u8).map(JointId)
    }

    /// Wire number (1..=6)
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Zero-based position in pose arrays
    pub fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Human readable joint name
    pub fn name(&self) -> &'static str {
        JOINT_NAMES[self.index()]
    }

    /// Angle limits for this joint
    pub fn bounds(&self) -> JointBounds {
        JOINT_BOUNDS[self.index()]
    }

    /// Validate an angle against this joint's limits
    pub fn check_angle(&self, angle: i32) -> Result<i32, CommandError> {
        let bounds = self.bounds();
        if bounds.contains(angle) {
            Ok(angle)
        } else {
            Err(CommandError::OutOfBounds {
                joint: self.0,
                angle,
                min: bounds.min,
                max: bounds.max,
            })
        }
    }
}

impl TryFrom<u8> for JointId {
    type Error = CommandError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        JointId::new(number).ok_or(CommandError::InvalidJoint(number))
    }
}

impl From<JointId> for u8 {
    fn from(joint: JointId) -> Self {
        joint.0
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_range() {
        assert!(JointId::new(0).is_none());
        assert!(JointId::new(7).is_none());
        assert_eq!(JointId::new(6), Some(JointId::GRIPPER));
        assert_eq!(JointId::all().count(), JOINT_COUNT);
    }

    #[test]
    fn test_joint_metadata() {
        assert_eq!(JointId::SHOULDER.name(), "Shoulder");
        assert_eq!(JointId::SHOULDER.bounds(), JointBounds::new(30, 150));
        assert_eq!(JointId::GRIPPER.to_string(), "J6");
        assert_eq!(JointId::ELBOW.index(), 2);
    }

    #[test]
    fn test_check_angle() {
        assert_eq!(JointId::GRIPPER.check_angle(90), Ok(90));
        assert_eq!(
            JointId::GRIPPER.check_angle(89),
            Err(CommandError::OutOfBounds {
                joint: 6,
                angle: 89,
                min: 90,
                max: 180
            })
        );
    }

    #[test]
    fn test_serde_rejects_invalid_joint() {
        let joint: JointId = serde_json::from_str("4").unwrap();
        assert_eq!(joint, JointId::WRIST_ROTATE);
        assert!(serde_json::from_str::<JointId>("9").is_err());
    }

    #[test]
    fn test_home_pose_within_bounds() {
        for joint in JointId::all() {
            assert!(joint.bounds().contains(HOME_ANGLES[joint.index()]));
        }
    }
}
