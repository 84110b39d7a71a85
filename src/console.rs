//! Terminal console
//!
//! Line commands read from stdin and applied to an [`ArmController`].

use anyhow::{anyhow, bail, Context};
use armctl_communication::{ArmController, Preset};
use armctl_core::{JointId, SequenceEntry, SequenceIndex};
use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;

/// Command reference printed by `help`
pub const HELP: &str = "\
Commands:
  j <joint> <angle>   move one joint (1-6)
  preset <name>       home, fold, wave, pick_ready, pick, place_ready, place
  speed <ms>          set step delay (5-200)
  stop                emergency stop
  status              request a position report
  read                read live potentiometer positions
  record <name>       start teaching a sequence
  end                 stop teaching
  list                list stored sequences
  play <index>        replay a stored sequence
  delete <index>      delete a stored sequence
  save <file>         save the sequence listing as JSON
  load <file>         show a saved sequence listing
  raw <text>          send text verbatim
  pose                show the local pose mirror
  help                show this help
  quit                disconnect and exit";

/// One console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Joint(JointId, i32),
    Preset(Preset),
    Speed(u32),
    Stop,
    Status,
    Read,
    Record(String),
    End,
    List,
    Play(SequenceIndex),
    Delete(SequenceIndex),
    Save(PathBuf),
    Load(PathBuf),
    Raw(String),
    Pose,
    Help,
    Quit,
}

/// What the console loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading, optionally printing a reply
    Continue(Option<String>),
    /// Leave the loop
    Quit,
}

fn number<T: FromStr>(arg: Option<&str>, what: &str) -> anyhow::Result<T> {
    let arg = arg.ok_or_else(|| anyhow!("missing {}", what))?;
    arg.parse()
        .map_err(|_| anyhow!("'{}' is not a valid {}", arg, what))
}

fn rest<'a>(arg: &'a str, what: &str) -> anyhow::Result<&'a str> {
    let arg = arg.trim();
    if arg.is_empty() {
        bail!("missing {}", what);
    }
    Ok(arg)
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (verb, tail) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = tail.split_whitespace();

        let command = match verb.to_ascii_lowercase().as_str() {
            "j" | "joint" => {
                let joint: u8 = number(args.next(), "joint")?;
                let joint = JointId::new(joint).ok_or_else(|| anyhow!("joint must be 1-6"))?;
                Self::Joint(joint, number(args.next(), "angle")?)
            }
            "preset" => Self::Preset(rest(tail, "preset name")?.parse()?),
            "speed" => Self::Speed(number(args.next(), "speed")?),
            "stop" => Self::Stop,
            "status" => Self::Status,
            "read" => Self::Read,
            "record" => Self::Record(rest(tail, "sequence name")?.to_string()),
            "end" => Self::End,
            "list" => Self::List,
            "play" => Self::Play(number(args.next(), "sequence index")?),
            "delete" => Self::Delete(number(args.next(), "sequence index")?),
            "save" => Self::Save(PathBuf::from(rest(tail, "file name")?)),
            "load" => Self::Load(PathBuf::from(rest(tail, "file name")?)),
            "raw" => Self::Raw(rest(tail, "text")?.to_string()),
            "pose" => Self::Pose,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{}', try 'help'", other),
        };

        Ok(command)
    }
}

impl ConsoleCommand {
    /// Apply the command to `controller`
    pub fn execute(&self, controller: &ArmController) -> anyhow::Result<Flow> {
        let reply = match self {
            Self::Joint(joint, angle) => {
                controller.move_joint(*joint, *angle)?;
                None
            }
            Self::Preset(preset) => {
                let lines = controller.run_preset(*preset)?;
                Some(format!("{} ({} lines)", preset, lines))
            }
            Self::Speed(ms) => {
                controller.set_speed(*ms)?;
                None
            }
            Self::Stop => {
                controller.emergency_stop()?;
                None
            }
            Self::Status => {
                controller.request_status()?;
                None
            }
            Self::Read => {
                controller.read_positions()?;
                None
            }
            Self::Record(name) => {
                let index = controller.start_recording(name)?;
                Some(format!("Recording '{}' as sequence {}", name.trim(), index))
            }
            Self::End => {
                controller.stop_recording()?;
                None
            }
            Self::List => {
                controller.list_sequences()?;
                None
            }
            Self::Play(index) => {
                controller.play_sequence(Some(*index))?;
                None
            }
            Self::Delete(index) => {
                controller.delete_sequence(Some(*index))?;
                None
            }
            Self::Save(path) => {
                let sequences = controller.sequences();
                armctl_settings::save_catalog(path, &sequences)
                    .with_context(|| format!("saving {}", path.display()))?;
                Some(format!("Saved {} sequences to {}", sequences.len(), path.display()))
            }
            Self::Load(path) => {
                let sequences = armctl_settings::load_catalog(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                Some(format_listing(&sequences))
            }
            Self::Raw(text) => {
                controller.send_raw(text)?;
                None
            }
            Self::Pose => Some(controller.positions().to_string()),
            Self::Help => Some(HELP.to_string()),
            Self::Quit => return Ok(Flow::Quit),
        };

        Ok(Flow::Continue(reply))
    }
}

fn format_listing(sequences: &[SequenceEntry]) -> String {
    if sequences.is_empty() {
        return "No stored sequences".to_string();
    }
    sequences
        .iter()
        .map(|entry| format!("  {}", entry))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read commands from `input` until `quit` or end of input
///
/// Parse and command errors are printed and do not end the loop.
pub fn run(controller: &ArmController, input: impl BufRead) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line.context("reading console input")?;
        if line.trim().is_empty() {
            continue;
        }

        let result = line
            .parse::<ConsoleCommand>()
            .and_then(|command| command.execute(controller));

        match result {
            Ok(Flow::Continue(Some(reply))) => println!("{}", reply),
            Ok(Flow::Continue(None)) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armctl_communication::{ConnectionParams, ControllerConfig, LoopbackTransport};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "j 2 90".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Joint(JointId::SHOULDER, 90)
        );
        assert_eq!(
            "preset pick ready".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Preset(Preset::PickReady)
        );
        assert_eq!(
            "record  my wave ".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Record("my wave".into())
        );
        assert_eq!("QUIT".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!("j 7 90".parse::<ConsoleCommand>().is_err());
        assert!("j 1".parse::<ConsoleCommand>().is_err());
        assert!("speed fast".parse::<ConsoleCommand>().is_err());
        assert!("record".parse::<ConsoleCommand>().is_err());
        assert!("dance".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_run_script() {
        let (transport, device) = LoopbackTransport::pair();
        let controller = ArmController::new(Arc::new(transport), ControllerConfig::default());
        let params = ConnectionParams::serial("loop").with_read_timeout(Duration::from_millis(20));
        controller.connect(&params).unwrap();

        let script = "j 1 45\nbogus\n\nspeed 20\nrecord demo\nend\nquit\nstop\n";
        run(&controller, script.as_bytes()).unwrap();

        assert_eq!(
            device.written_lines(),
            vec!["J1:45", "SET_SPEED:20", "RECORD_START:0:demo", "RECORD_STOP"]
        );
        assert_eq!(controller.positions().get(JointId::BASE), 45);
    }

    #[test]
    fn test_save_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sequences.json");
        let (transport, _device) = LoopbackTransport::pair();
        let controller = ArmController::new(Arc::new(transport), ControllerConfig::default());

        let flow = ConsoleCommand::Save(path.clone()).execute(&controller).unwrap();
        assert_eq!(
            flow,
            Flow::Continue(Some(format!("Saved 0 sequences to {}", path.display())))
        );
        assert!(armctl_settings::load_catalog(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_catalog_listing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sequences.json");
        let entries = vec![SequenceEntry::new(0, "pick"), SequenceEntry::new(3, "wave")];
        armctl_settings::save_catalog(&path, &entries).unwrap();

        let command = format!("load {}", path.display()).parse::<ConsoleCommand>().unwrap();
        assert_eq!(command, ConsoleCommand::Load(path.clone()));

        let (transport, _device) = LoopbackTransport::pair();
        let controller = ArmController::new(Arc::new(transport), ControllerConfig::default());
        let Flow::Continue(Some(reply)) = command.execute(&controller).unwrap() else {
            panic!("expected a listing");
        };
        assert_eq!(reply, format!("  {}\n  {}", entries[0], entries[1]));

        assert!(ConsoleCommand::Load(dir.path().join("missing.json"))
            .execute(&controller)
            .is_err());
    }
}
