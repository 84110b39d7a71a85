//! Position State Store
//!
//! Local mirror of the arm pose. Operator moves are bounds-checked before
//! they touch the mirror; device reports are trusted as ground truth and are
//! applied without any check or echo.

use crate::protocol::{encode, OutgoingCommand, PositionReport};
use armctl_core::{ArmPose, CommandError, JointId};
use parking_lot::RwLock;

/// A locally accepted joint move, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMove {
    /// Joint that moved
    pub joint: JointId,
    /// Accepted angle
    pub angle: i32,
    /// Encoded `J<n>:<angle>` line, newline-terminated
    pub line: String,
}

/// Mirror of the commanded and reported joint angles
#[derive(Debug, Default)]
pub struct PositionStore {
    pose: RwLock<ArmPose>,
}

impl PositionStore {
    /// Create a store holding the home pose
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept an operator move if it is within the joint's bounds
    ///
    /// Out-of-bounds angles are rejected and leave the mirror unchanged.
    pub fn propose_local(&self, joint: JointId, angle: i32) -> Result<AcceptedMove, CommandError> {
        let angle = joint.check_angle(angle)?;
        let line = encode(&OutgoingCommand::SetJoint(joint, angle))?;
        self.pose.write().set(joint, angle);

        Ok(AcceptedMove { joint, angle, line })
    }

    /// Apply a device report and return the resulting pose
    pub fn apply_report(&self, report: &PositionReport) -> ArmPose {
        let mut pose = self.pose.write();
        for update in &report.updates {
            pose.set(update.joint, update.angle);
        }
        *pose
    }

    /// Current pose
    pub fn snapshot(&self) -> ArmPose {
        *self.pose.read()
    }

    /// Restore the home pose
    pub fn reset(&self) {
        *self.pose.write() = ArmPose::home();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JointUpdate;

    #[test]
    fn test_propose_updates_snapshot() {
        let store = PositionStore::new();
        let accepted = store.propose_local(JointId::ELBOW, 120).unwrap();
        assert_eq!(accepted.line, "J3:120\n");
        assert_eq!(store.snapshot().get(JointId::ELBOW), 120);
    }

    #[test]
    fn test_report_bypasses_bounds() {
        let store = PositionStore::new();
        let report = PositionReport {
            updates: vec![
                JointUpdate {
                    joint: JointId::BASE,
                    angle: 90,
                },
                JointUpdate {
                    joint: JointId::SHOULDER,
                    angle: 200,
                },
            ],
            skipped: Vec::new(),
        };

        let pose = store.apply_report(&report);
        assert_eq!(pose.get(JointId::BASE), 90);
        assert_eq!(pose.get(JointId::SHOULDER), 200);
        assert_eq!(pose.get(JointId::GRIPPER), 152);
    }

    #[test]
    fn test_reset() {
        let store = PositionStore::new();
        store.propose_local(JointId::BASE, 10).unwrap();
        store.reset();
        assert_eq!(store.snapshot(), ArmPose::home());
    }
}
