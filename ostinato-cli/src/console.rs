//! Line-oriented control console read from stdin.

use ostinato_types::{ArpMode, ArpRate, ArpeggiatorPatch, OctaveMode};

pub const HELP: &str = "\
commands:
  on | off            enable or disable the arpeggiator
  latch               toggle latch
  panic               stop and release everything
  mode <name>         up down updown downup random asplayed converge diverge chord
  octmode <name>      up down updown
  rate <symbol>       1/1 .. 1/32, with T (triplet) or D (dotted) suffix
  octaves <1-4>
  gate <pct>          10-200
  swing <pct>         -50-50
  prob <pct>          0-100
  bpm <n>             20-300
  status
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Patch(ArpeggiatorPatch),
    ToggleLatch,
    Panic,
    Bpm(f32),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();

    let patch = match cmd.to_ascii_lowercase().as_str() {
        "on" => ArpeggiatorPatch {
            enabled: Some(true),
            ..Default::default()
        },
        "off" => ArpeggiatorPatch {
            enabled: Some(false),
            ..Default::default()
        },
        "latch" => return Ok(ConsoleCommand::ToggleLatch),
        "panic" => return Ok(ConsoleCommand::Panic),
        "status" => return Ok(ConsoleCommand::Status),
        "help" | "?" => return Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => return Ok(ConsoleCommand::Quit),
        "bpm" => return Ok(ConsoleCommand::Bpm(number(cmd, arg)?)),
        "mode" => ArpeggiatorPatch {
            mode: Some(required(cmd, arg)?.parse::<ArpMode>().map_err(|e| e.to_string())?),
            ..Default::default()
        },
        "octmode" => ArpeggiatorPatch {
            octave_mode: Some(
                required(cmd, arg)?
                    .parse::<OctaveMode>()
                    .map_err(|e| e.to_string())?,
            ),
            ..Default::default()
        },
        "rate" => ArpeggiatorPatch {
            rate: Some(required(cmd, arg)?.parse::<ArpRate>().map_err(|e| e.to_string())?),
            ..Default::default()
        },
        "octaves" => {
            let octaves = required(cmd, arg)?
                .parse::<u8>()
                .map_err(|_| format!("octaves: expected 1-4, got '{}'", arg.unwrap_or_default()))?;
            ArpeggiatorPatch {
                octaves: Some(octaves),
                ..Default::default()
            }
        }
        "gate" => ArpeggiatorPatch {
            gate_percent: Some(number(cmd, arg)?),
            ..Default::default()
        },
        "swing" => ArpeggiatorPatch {
            swing_percent: Some(number(cmd, arg)?),
            ..Default::default()
        },
        "prob" => ArpeggiatorPatch {
            probability_percent: Some(number(cmd, arg)?),
            ..Default::default()
        },
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(ConsoleCommand::Patch(patch))
}

fn required<'a>(cmd: &str, arg: Option<&'a str>) -> Result<&'a str, String> {
    arg.ok_or_else(|| format!("{}: missing argument", cmd))
}

fn number(cmd: &str, arg: Option<&str>) -> Result<f32, String> {
    let text = required(cmd, arg)?;
    match text.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("{}: expected a number, got '{}'", cmd, text)),
    }
}
