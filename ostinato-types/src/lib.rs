//! # ostinato-types
//!
//! Shared type definitions for the ostinato arpeggiator.
//! Plain data only: configuration, modes, the rate table and note events.
//! Behaviour (pattern generation, scheduling) lives in `ostinato-core`.

pub mod arpeggiator;
pub mod note;
pub mod rate;

pub use arpeggiator::*;
pub use note::{HeldNote, NoteEvent};
pub use rate::{clamp_bpm, ArpRate, ParseRateError, BPM_RANGE, DEFAULT_BPM};
