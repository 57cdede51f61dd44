//! Rate table: named musical divisions converted to step durations.

use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const BPM_RANGE: RangeInclusive<f32> = 20.0..=300.0;
pub const DEFAULT_BPM: f32 = 120.0;

/// Clamp a tempo to the supported range. NaN falls back to the default tempo.
pub fn clamp_bpm(bpm: f32) -> f32 {
    if bpm.is_nan() {
        return DEFAULT_BPM;
    }
    bpm.clamp(*BPM_RANGE.start(), *BPM_RANGE.end())
}

/// Step rate of the arpeggiator, as a note division relative to a quarter-note beat.
///
/// `T` variants are triplets (two thirds of the straight value), `D` variants
/// are dotted (one and a half times the straight value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArpRate {
    #[serde(rename = "1/1")]
    Whole,
    #[serde(rename = "1/1T")]
    WholeTriplet,
    #[serde(rename = "1/1D")]
    WholeDotted,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/2T")]
    HalfTriplet,
    #[serde(rename = "1/2D")]
    HalfDotted,
    #[serde(rename = "1/4")]
    Quarter,
    #[serde(rename = "1/4T")]
    QuarterTriplet,
    #[serde(rename = "1/4D")]
    QuarterDotted,
    #[default]
    #[serde(rename = "1/8")]
    Eighth,
    #[serde(rename = "1/8T")]
    EighthTriplet,
    #[serde(rename = "1/8D")]
    EighthDotted,
    #[serde(rename = "1/16")]
    Sixteenth,
    #[serde(rename = "1/16T")]
    SixteenthTriplet,
    #[serde(rename = "1/16D")]
    SixteenthDotted,
    #[serde(rename = "1/32")]
    ThirtySecond,
    #[serde(rename = "1/32T")]
    ThirtySecondTriplet,
    #[serde(rename = "1/32D")]
    ThirtySecondDotted,
}

impl ArpRate {
    pub const ALL: [ArpRate; 18] = [
        ArpRate::Whole,
        ArpRate::WholeTriplet,
        ArpRate::WholeDotted,
        ArpRate::Half,
        ArpRate::HalfTriplet,
        ArpRate::HalfDotted,
        ArpRate::Quarter,
        ArpRate::QuarterTriplet,
        ArpRate::QuarterDotted,
        ArpRate::Eighth,
        ArpRate::EighthTriplet,
        ArpRate::EighthDotted,
        ArpRate::Sixteenth,
        ArpRate::SixteenthTriplet,
        ArpRate::SixteenthDotted,
        ArpRate::ThirtySecond,
        ArpRate::ThirtySecondTriplet,
        ArpRate::ThirtySecondDotted,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            ArpRate::Whole => "1/1",
            ArpRate::WholeTriplet => "1/1T",
            ArpRate::WholeDotted => "1/1D",
            ArpRate::Half => "1/2",
            ArpRate::HalfTriplet => "1/2T",
            ArpRate::HalfDotted => "1/2D",
            ArpRate::Quarter => "1/4",
            ArpRate::QuarterTriplet => "1/4T",
            ArpRate::QuarterDotted => "1/4D",
            ArpRate::Eighth => "1/8",
            ArpRate::EighthTriplet => "1/8T",
            ArpRate::EighthDotted => "1/8D",
            ArpRate::Sixteenth => "1/16",
            ArpRate::SixteenthTriplet => "1/16T",
            ArpRate::SixteenthDotted => "1/16D",
            ArpRate::ThirtySecond => "1/32",
            ArpRate::ThirtySecondTriplet => "1/32T",
            ArpRate::ThirtySecondDotted => "1/32D",
        }
    }

    /// Length of one step in beats (quarter notes).
    pub fn beat_fraction(&self) -> f64 {
        use ArpRate::*;
        let straight = match self {
            Whole | WholeTriplet | WholeDotted => 4.0,
            Half | HalfTriplet | HalfDotted => 2.0,
            Quarter | QuarterTriplet | QuarterDotted => 1.0,
            Eighth | EighthTriplet | EighthDotted => 0.5,
            Sixteenth | SixteenthTriplet | SixteenthDotted => 0.25,
            ThirtySecond | ThirtySecondTriplet | ThirtySecondDotted => 0.125,
        };
        match self {
            WholeTriplet | HalfTriplet | QuarterTriplet | EighthTriplet | SixteenthTriplet
            | ThirtySecondTriplet => straight / 1.5,
            WholeDotted | HalfDotted | QuarterDotted | EighthDotted | SixteenthDotted
            | ThirtySecondDotted => straight * 1.5,
            _ => straight,
        }
    }

    /// Step duration in milliseconds at the given tempo (clamped to [`BPM_RANGE`]).
    pub fn step_ms(&self, bpm: f32) -> f64 {
        (60_000.0 / clamp_bpm(bpm) as f64) * self.beat_fraction()
    }

    pub fn next(&self) -> ArpRate {
        let idx = Self::ALL.iter().position(|r| r == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> ArpRate {
        let idx = Self::ALL.iter().position(|r| r == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for ArpRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned when a rate symbol is not one of [`ArpRate::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRateError(pub String);

impl std::fmt::Display for ParseRateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown rate symbol: {}", self.0)
    }
}

impl std::error::Error for ParseRateError {}

impl FromStr for ArpRate {
    type Err = ParseRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ArpRate::ALL
            .iter()
            .copied()
            .find(|r| r.symbol().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseRateError(trimmed.to_string()))
    }
}
