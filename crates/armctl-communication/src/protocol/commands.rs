//! Outgoing command model and encoder
//!
//! Every command is encoded as a single newline-terminated ASCII line.
//! [`parse_command`] is the inverse of [`encode`] and accepts the same grammar
//! (minus the trailing newline).

use armctl_core::{CommandError, JointId, SequenceIndex};
use std::fmt;
use std::str::FromStr;

/// Lowest accepted inter-step delay for `SET_SPEED`
pub const MIN_SPEED_MS: u32 = 5;
/// Highest accepted inter-step delay for `SET_SPEED`
pub const MAX_SPEED_MS: u32 = 200;

/// Named target pose or gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Device home pose
    Home,
    /// Device fold (transport) pose
    Fold,
    /// Wave gesture
    Wave,
    /// Hover above the pick location
    PickReady,
    /// Close the gripper at the pick location
    Pick,
    /// Hover above the place location
    PlaceReady,
    /// Lower to the place location
    Place,
}

impl Preset {
    /// All presets, in menu order
    pub const ALL: [Preset; 7] = [
        Preset::Home,
        Preset::Fold,
        Preset::Wave,
        Preset::PickReady,
        Preset::Pick,
        Preset::PlaceReady,
        Preset::Place,
    ];

    /// Wire token
    pub fn token(&self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Fold => "FOLD",
            Self::Wave => "WAVE",
            Self::PickReady => "PICK_READY",
            Self::Pick => "PICK",
            Self::PlaceReady => "PLACE_READY",
            Self::Place => "PLACE",
        }
    }

    /// Look up a preset by its wire token
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Preset {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Preset::from_token(&token).ok_or_else(|| CommandError::UnknownPreset(s.to_string()))
    }
}

/// Commands the engine can put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingCommand {
    /// Move one joint to an absolute angle
    SetJoint(JointId, i32),
    /// Set the device's inter-step delay in milliseconds
    SetSpeed(u32),
    /// Named preset, expanded by the dispatcher when not native
    NamedPreset(Preset),
    /// Immediate halt
    Stop,
    /// Request a position report
    RequestStatus,
    /// Begin teaching a sequence
    RecordStart(SequenceIndex, String),
    /// End teaching
    RecordStop,
    /// Request the stored sequence catalog
    ListSequences,
    /// Replay a stored sequence
    PlaySequence(SequenceIndex),
    /// Remove a stored sequence
    DeleteSequence(SequenceIndex),
    /// Request a live potentiometer read (teach mode)
    RequestPositions,
    /// Arbitrary text sent verbatim
    RawPassthrough(String),
}

/// Encode a command into its wire line, including the trailing newline
pub fn encode(command: &OutgoingCommand) -> Result<String, CommandError> {
    use OutgoingCommand::*;

    let body = match command {
        SetJoint(joint, angle) => {
            joint.check_angle(*angle).map_err(|e| CommandError::Encoding {
                reason: e.to_string(),
            })?;
            format!("J{}:{}", joint.number(), angle)
        }
        SetSpeed(ms) => format!("SET_SPEED:{}", ms),
        NamedPreset(preset) => preset.token().to_string(),
        Stop => "STOP".to_string(),
        RequestStatus => "STATUS".to_string(),
        RecordStart(index, name) => {
            reject_line_breaks("sequence name", name)?;
            format!("RECORD_START:{}:{}", index, name)
        }
        RecordStop => "RECORD_STOP".to_string(),
        ListSequences => "LIST_SEQUENCES".to_string(),
        PlaySequence(index) => format!("PLAY_SEQUENCE:{}", index),
        DeleteSequence(index) => format!("DELETE_SEQUENCE:{}", index),
        RequestPositions => "READ_POSITIONS".to_string(),
        RawPassthrough(text) => {
            if text.trim().is_empty() {
                return Err(CommandError::Encoding {
                    reason: "raw command is empty".to_string(),
                });
            }
            reject_line_breaks("raw command", text)?;
            text.clone()
        }
    };

    Ok(format!("{}\n", body))
}

fn reject_line_breaks(what: &str, text: &str) -> Result<(), CommandError> {
    if text.contains(['\n', '\r']) {
        return Err(CommandError::Encoding {
            reason: format!("{} contains a line break", what),
        });
    }
    Ok(())
}

/// Parse an outgoing command line
///
/// Recognises the outgoing grammar only; anything else returns `None`.
/// A trailing newline is ignored.
pub fn parse_command(line: &str) -> Option<OutgoingCommand> {
    use OutgoingCommand::*;

    let line = line.trim_end_matches(['\n', '\r']);

    match line {
        "STOP" => return Some(Stop),
        "STATUS" => return Some(RequestStatus),
        "RECORD_STOP" => return Some(RecordStop),
        "LIST_SEQUENCES" => return Some(ListSequences),
        "READ_POSITIONS" => return Some(RequestPositions),
        _ => {}
    }

    if let Some(preset) = Preset::from_token(line) {
        return Some(NamedPreset(preset));
    }

    if let Some(ms) = line.strip_prefix("SET_SPEED:") {
        return ms.parse().ok().map(SetSpeed);
    }

    if let Some(rest) = line.strip_prefix("RECORD_START:") {
        let (index, name) = rest.split_once(':')?;
        return Some(RecordStart(index.parse().ok()?, name.to_string()));
    }

    if let Some(index) = line.strip_prefix("PLAY_SEQUENCE:") {
        return index.parse().ok().map(PlaySequence);
    }

    if let Some(index) = line.strip_prefix("DELETE_SEQUENCE:") {
        return index.parse().ok().map(DeleteSequence);
    }

    let (joint, angle) = line.strip_prefix('J')?.split_once(':')?;
    let joint = JointId::new(joint.parse().ok()?)?;
    Some(SetJoint(joint, angle.parse().ok()?))
}

impl fmt::Display for OutgoingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match encode(self) {
            Ok(line) => f.write_str(line.trim_end()),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_joint() {
        let cmd = OutgoingCommand::SetJoint(JointId::BASE, 90);
        assert_eq!(encode(&cmd).unwrap(), "J1:90\n");
    }

    #[test]
    fn test_encode_joint_out_of_bounds() {
        let cmd = OutgoingCommand::SetJoint(JointId::SHOULDER, 10);
        assert!(matches!(encode(&cmd), Err(CommandError::Encoding { .. })));
    }

    #[test]
    fn test_encode_fixed_tokens() {
        assert_eq!(encode(&OutgoingCommand::Stop).unwrap(), "STOP\n");
        assert_eq!(encode(&OutgoingCommand::RequestStatus).unwrap(), "STATUS\n");
        assert_eq!(
            encode(&OutgoingCommand::RequestPositions).unwrap(),
            "READ_POSITIONS\n"
        );
        assert_eq!(
            encode(&OutgoingCommand::NamedPreset(Preset::Fold)).unwrap(),
            "FOLD\n"
        );
    }

    #[test]
    fn test_encode_sequence_commands() {
        assert_eq!(
            encode(&OutgoingCommand::RecordStart(3, "pick box".to_string())).unwrap(),
            "RECORD_START:3:pick box\n"
        );
        assert_eq!(
            encode(&OutgoingCommand::PlaySequence(2)).unwrap(),
            "PLAY_SEQUENCE:2\n"
        );
        assert_eq!(
            encode(&OutgoingCommand::DeleteSequence(7)).unwrap(),
            "DELETE_SEQUENCE:7\n"
        );
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        let cmd = OutgoingCommand::RawPassthrough("STOP\nHOME".to_string());
        assert!(encode(&cmd).is_err());
        let cmd = OutgoingCommand::RecordStart(0, "a\rb".to_string());
        assert!(encode(&cmd).is_err());
        assert!(encode(&OutgoingCommand::RawPassthrough("  ".to_string())).is_err());
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("J6:120\n"),
            Some(OutgoingCommand::SetJoint(JointId::GRIPPER, 120))
        );
        assert_eq!(parse_command("SET_SPEED:20"), Some(OutgoingCommand::SetSpeed(20)));
        assert_eq!(
            parse_command("RECORD_START:1:a:b"),
            Some(OutgoingCommand::RecordStart(1, "a:b".to_string()))
        );
        assert_eq!(parse_command("J7:90"), None);
        assert_eq!(parse_command("J1:ninety"), None);
        assert_eq!(parse_command("hello"), None);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("pick ready".parse::<Preset>().unwrap(), Preset::PickReady);
        assert_eq!("PLACE".parse::<Preset>().unwrap(), Preset::Place);
        assert!("dance".parse::<Preset>().is_err());
    }
}
