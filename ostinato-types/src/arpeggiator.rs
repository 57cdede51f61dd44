use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rate::ArpRate;

pub const OCTAVES_RANGE: RangeInclusive<u8> = 1..=4;
pub const GATE_RANGE: RangeInclusive<f32> = 10.0..=200.0;
pub const SWING_RANGE: RangeInclusive<f32> = -50.0..=50.0;
pub const TIMING_JITTER_RANGE: RangeInclusive<f32> = 0.0..=50.0;
pub const SPREAD_RANGE: RangeInclusive<f32> = 0.0..=50.0;
pub const PERCENT_RANGE: RangeInclusive<f32> = 0.0..=100.0;

/// Clamp `value` into `range`; NaN collapses to the range start.
pub fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

pub fn clamp_octaves(octaves: u8) -> u8 {
    octaves.clamp(*OCTAVES_RANGE.start(), *OCTAVES_RANGE.end())
}

/// Arpeggiator configuration. No hidden state: everything the scheduler
/// and pattern generator read lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggiatorConfig {
    pub enabled: bool,
    pub mode: ArpMode,
    pub octaves: u8, // 1-4
    pub octave_mode: OctaveMode,
    pub rate: ArpRate,
    pub gate_percent: f32,  // 10-200 (note length as percentage of step)
    pub swing_percent: f32, // -50-50
    pub timing_jitter_ms: f32,
    pub velocity_spread_percent: f32,
    pub gate_spread_percent: f32,
    pub drunk: bool,
    pub probability_percent: f32,
    pub random_octave_chance_percent: f32,
    pub shuffle_percent: f32,
    pub latch: bool,
    pub sync: bool,
}

impl Default for ArpeggiatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ArpMode::Up,
            octaves: 1,
            octave_mode: OctaveMode::Up,
            rate: ArpRate::Eighth,
            gate_percent: 50.0,
            swing_percent: 0.0,
            timing_jitter_ms: 0.0,
            velocity_spread_percent: 0.0,
            gate_spread_percent: 0.0,
            drunk: false,
            probability_percent: 100.0,
            random_octave_chance_percent: 0.0,
            shuffle_percent: 0.0,
            latch: false,
            sync: false,
        }
    }
}

impl ArpeggiatorConfig {
    /// Copy of this config with every ranged field clamped.
    pub fn sanitized(&self) -> Self {
        Self {
            octaves: clamp_octaves(self.octaves),
            gate_percent: clamp_to(self.gate_percent, &GATE_RANGE),
            swing_percent: clamp_to(self.swing_percent, &SWING_RANGE),
            timing_jitter_ms: clamp_to(self.timing_jitter_ms, &TIMING_JITTER_RANGE),
            velocity_spread_percent: clamp_to(self.velocity_spread_percent, &SPREAD_RANGE),
            gate_spread_percent: clamp_to(self.gate_spread_percent, &SPREAD_RANGE),
            probability_percent: clamp_to(self.probability_percent, &PERCENT_RANGE),
            random_octave_chance_percent: clamp_to(
                self.random_octave_chance_percent,
                &PERCENT_RANGE,
            ),
            shuffle_percent: clamp_to(self.shuffle_percent, &PERCENT_RANGE),
            ..self.clone()
        }
    }

    /// Overlay every field present in `patch`, then clamp.
    pub fn merged(&self, patch: &ArpeggiatorPatch) -> Self {
        let mut out = self.clone();
        if let Some(v) = patch.enabled {
            out.enabled = v;
        }
        if let Some(v) = patch.mode {
            out.mode = v;
        }
        if let Some(v) = patch.octaves {
            out.octaves = v;
        }
        if let Some(v) = patch.octave_mode {
            out.octave_mode = v;
        }
        if let Some(v) = patch.rate {
            out.rate = v;
        }
        if let Some(v) = patch.gate_percent {
            out.gate_percent = v;
        }
        if let Some(v) = patch.swing_percent {
            out.swing_percent = v;
        }
        if let Some(v) = patch.timing_jitter_ms {
            out.timing_jitter_ms = v;
        }
        if let Some(v) = patch.velocity_spread_percent {
            out.velocity_spread_percent = v;
        }
        if let Some(v) = patch.gate_spread_percent {
            out.gate_spread_percent = v;
        }
        if let Some(v) = patch.drunk {
            out.drunk = v;
        }
        if let Some(v) = patch.probability_percent {
            out.probability_percent = v;
        }
        if let Some(v) = patch.random_octave_chance_percent {
            out.random_octave_chance_percent = v;
        }
        if let Some(v) = patch.shuffle_percent {
            out.shuffle_percent = v;
        }
        if let Some(v) = patch.latch {
            out.latch = v;
        }
        if let Some(v) = patch.sync {
            out.sync = v;
        }
        out.sanitized()
    }
}

/// Partial configuration. `None` leaves the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggiatorPatch {
    pub enabled: Option<bool>,
    pub mode: Option<ArpMode>,
    pub octaves: Option<u8>,
    pub octave_mode: Option<OctaveMode>,
    pub rate: Option<ArpRate>,
    pub gate_percent: Option<f32>,
    pub swing_percent: Option<f32>,
    pub timing_jitter_ms: Option<f32>,
    pub velocity_spread_percent: Option<f32>,
    pub gate_spread_percent: Option<f32>,
    pub drunk: Option<bool>,
    pub probability_percent: Option<f32>,
    pub random_octave_chance_percent: Option<f32>,
    pub shuffle_percent: Option<f32>,
    pub latch: Option<bool>,
    pub sync: Option<bool>,
}

impl ArpeggiatorPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    UpDown,
    DownUp,
    Random,
    AsPlayed,
    Converge,
    Diverge,
    Chord,
}

impl ArpMode {
    pub const ALL: [ArpMode; 9] = [
        ArpMode::Up,
        ArpMode::Down,
        ArpMode::UpDown,
        ArpMode::DownUp,
        ArpMode::Random,
        ArpMode::AsPlayed,
        ArpMode::Converge,
        ArpMode::Diverge,
        ArpMode::Chord,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArpMode::Up => "Up",
            ArpMode::Down => "Down",
            ArpMode::UpDown => "Up/Down",
            ArpMode::DownUp => "Down/Up",
            ArpMode::Random => "Random",
            ArpMode::AsPlayed => "As Played",
            ArpMode::Converge => "Converge",
            ArpMode::Diverge => "Diverge",
            ArpMode::Chord => "Chord",
        }
    }

    pub fn next(&self) -> ArpMode {
        let idx = Self::ALL.iter().position(|m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> ArpMode {
        let idx = Self::ALL.iter().position(|m| m == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Direction in which octave repetitions of the pattern are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OctaveMode {
    #[default]
    Up,
    Down,
    UpDown,
}

impl OctaveMode {
    pub const ALL: [OctaveMode; 3] = [OctaveMode::Up, OctaveMode::Down, OctaveMode::UpDown];

    pub fn name(&self) -> &'static str {
        match self {
            OctaveMode::Up => "Up",
            OctaveMode::Down => "Down",
            OctaveMode::UpDown => "Up/Down",
        }
    }

    pub fn next(&self) -> OctaveMode {
        match self {
            OctaveMode::Up => OctaveMode::Down,
            OctaveMode::Down => OctaveMode::UpDown,
            OctaveMode::UpDown => OctaveMode::Up,
        }
    }

    pub fn prev(&self) -> OctaveMode {
        match self {
            OctaveMode::Up => OctaveMode::UpDown,
            OctaveMode::Down => OctaveMode::Up,
            OctaveMode::UpDown => OctaveMode::Down,
        }
    }
}

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(pub String);

impl std::fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown mode: {}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

/// Lowercase and strip separators so "Up/Down", "up-down" and "up_down" compare equal.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for ArpMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        ArpMode::ALL
            .iter()
            .copied()
            .find(|m| normalize(m.name()) == key)
            .ok_or_else(|| ParseModeError(s.trim().to_string()))
    }
}

impl FromStr for OctaveMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        OctaveMode::ALL
            .iter()
            .copied()
            .find(|m| normalize(m.name()) == key)
            .ok_or_else(|| ParseModeError(s.trim().to_string()))
    }
}
