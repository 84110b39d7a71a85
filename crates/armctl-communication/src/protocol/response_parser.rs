//! Device Response Parser
//!
//! Parses the lines the arm controller sends back: position reports
//! (`OK:`), device faults (`ERROR:`) and the multi-line sequence catalog
//! (`SEQUENCE:`). Anything else is surfaced as [`IncomingMessage::Unrecognized`].
//!
//! Malformed fragments inside a report or catalog never abort the rest of the
//! message; they are collected in the `skipped` lists so the engine can report
//! them.

use armctl_core::{JointId, SequenceEntry};

const OK_PREFIX: &str = "OK:";
const ERROR_PREFIX: &str = "ERROR:";
const SEQUENCE_PREFIX: &str = "SEQUENCE:";

/// One joint update inside a position report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointUpdate {
    /// Reported joint
    pub joint: JointId,
    /// Reported angle, not checked against local bounds
    pub angle: i32,
}

/// Partial pose reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionReport {
    /// Joint updates in the order they appeared
    pub updates: Vec<JointUpdate>,
    /// Fragments that could not be decoded
    pub skipped: Vec<String>,
}

/// Sequence catalog reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceList {
    /// Entries in the order they appeared
    pub entries: Vec<SequenceEntry>,
    /// Entry lines that could not be decoded
    pub skipped: Vec<String>,
}

/// A decoded device message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    /// `OK:J1:<a>,J2:<a>,...`
    PositionReport(PositionReport),
    /// `SEQUENCE:` followed by `<index>:<name>` lines
    SequenceList(SequenceList),
    /// `ERROR:<text>`
    DeviceError(String),
    /// Any other line
    Unrecognized(String),
}

/// Decode a device message
///
/// Single-line messages are decoded from the first line. A `SEQUENCE:` block
/// takes every following line as a catalog entry until a blank line or
/// another known prefix.
pub fn decode(text: &str) -> IncomingMessage {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("").trim();

    match first.strip_prefix(SEQUENCE_PREFIX) {
        Some(inline) => {
            let mut list = SequenceList::default();
            push_entry_line(&mut list, inline);
            for line in lines {
                if line.trim().is_empty() || has_known_prefix(line.trim()) {
                    break;
                }
                push_entry_line(&mut list, line);
            }
            IncomingMessage::SequenceList(list)
        }
        None => decode_line(first),
    }
}

/// Decode one line that is not part of a sequence catalog block
fn decode_line(line: &str) -> IncomingMessage {
    if let Some(body) = line.strip_prefix(OK_PREFIX) {
        return IncomingMessage::PositionReport(parse_position_report(body));
    }

    if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
        return IncomingMessage::DeviceError(message.trim().to_string());
    }

    IncomingMessage::Unrecognized(line.to_string())
}

/// Parse the body of an `OK:` report
pub fn parse_position_report(body: &str) -> PositionReport {
    let mut report = PositionReport::default();

    for fragment in body.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match parse_joint_pair(fragment) {
            Some(update) => report.updates.push(update),
            None => report.skipped.push(fragment.to_string()),
        }
    }

    report
}

fn parse_joint_pair(fragment: &str) -> Option<JointUpdate> {
    let (joint, angle) = fragment.strip_prefix('J')?.split_once(':')?;
    let joint = JointId::new(joint.trim().parse().ok()?)?;
    let angle = angle.trim().parse().ok()?;
    Some(JointUpdate { joint, angle })
}

/// Parse one `<index>:<name>` catalog line
pub fn parse_sequence_entry(line: &str) -> Option<SequenceEntry> {
    let (index, name) = line.split_once(':')?;
    let index = index.trim().parse().ok()?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(SequenceEntry::new(index, name))
}

fn push_entry_line(list: &mut SequenceList, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match parse_sequence_entry(line) {
        Some(entry) => list.entries.push(entry),
        None => list.skipped.push(line.to_string()),
    }
}

fn has_known_prefix(line: &str) -> bool {
    [OK_PREFIX, ERROR_PREFIX, SEQUENCE_PREFIX]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Line-at-a-time decoder used by the receive loop
///
/// Holds an open `SEQUENCE:` block across lines. The block ends on a blank
/// line, on a line with a known prefix, or when the caller signals an idle
/// period through [`StreamDecoder::flush`].
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Option<SequenceList>,
}

impl StreamDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a catalog block is open
    pub fn in_sequence_block(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one complete line (without terminator)
    pub fn push_line(&mut self, line: &str) -> Vec<IncomingMessage> {
        let line = line.trim();
        let mut out = Vec::new();

        if let Some(list) = self.pending.as_mut() {
            if !line.is_empty() && !has_known_prefix(line) {
                push_entry_line(list, line);
                return out;
            }
            out.extend(self.flush());
        }

        if line.is_empty() {
            return out;
        }

        match line.strip_prefix(SEQUENCE_PREFIX) {
            Some(inline) => {
                let mut list = SequenceList::default();
                push_entry_line(&mut list, inline);
                self.pending = Some(list);
            }
            None => out.push(decode_line(line)),
        }

        out
    }

    /// Close any open catalog block
    pub fn flush(&mut self) -> Option<IncomingMessage> {
        self.pending.take().map(IncomingMessage::SequenceList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_report() {
        let msg = decode("OK:J4:100,J6:150");
        let IncomingMessage::PositionReport(report) = msg else {
            panic!("expected position report");
        };
        assert_eq!(report.updates.len(), 2);
        assert_eq!(report.updates[1].joint, JointId::GRIPPER);
        assert_eq!(report.updates[1].angle, 150);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_stream_decoder_block_ends_on_prefix() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push_line("SEQUENCE:").is_empty());
        assert!(decoder.push_line("0:wave").is_empty());
        assert!(decoder.in_sequence_block());

        let out = decoder.push_line("OK:J1:10");
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], IncomingMessage::SequenceList(l) if l.entries.len() == 1));
        assert!(matches!(&out[1], IncomingMessage::PositionReport(_)));
        assert!(!decoder.in_sequence_block());
    }

    #[test]
    fn test_stream_decoder_blank_line() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push_line("").is_empty());
        decoder.push_line("SEQUENCE:");
        let out = decoder.push_line("");
        assert_eq!(
            out,
            vec![IncomingMessage::SequenceList(SequenceList::default())]
        );
        assert!(decoder.flush().is_none());
    }
}
