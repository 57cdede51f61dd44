use serde::{Deserialize, Serialize};

/// A note currently contributing to the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldNote {
    pub note: u8,     // 0-127
    pub velocity: u8, // 1-127
    /// Monotonic press counter; lower values were pressed earlier.
    pub arrival_order: u64,
}

/// Event emitted towards the sound-producing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl NoteEvent {
    pub fn is_note_on(&self) -> bool {
        matches!(self, NoteEvent::NoteOn { .. })
    }
}
